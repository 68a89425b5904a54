use clap::{builder::ValueParser, Arg, ArgMatches, Command};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";

/// Names accepted by `TESSERA_LOG_LEVEL`, indexed by the equivalent `-v` count.
const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

fn parse_level(value: &str) -> Result<u8, String> {
    let lowered = value.to_ascii_lowercase();
    LEVEL_NAMES
        .iter()
        .position(|name| *name == lowered)
        .or_else(|| {
            value
                .parse::<usize>()
                .ok()
                .filter(|count| *count < LEVEL_NAMES.len())
        })
        .and_then(|count| u8::try_from(count).ok())
        .ok_or_else(|| {
            format!(
                "invalid log level '{value}', expected 0-4 or one of: {}",
                LEVEL_NAMES.join(", ")
            )
        })
}

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(parse_level)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("TESSERA_LOG_LEVEL")
            .global(true)
            .action(clap::ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

/// Tracing level requested by `-v` or `TESSERA_LOG_LEVEL`. `None` leaves the
/// subscriber on its default filter.
#[must_use]
pub fn level(matches: &ArgMatches) -> Option<Level> {
    match matches.get_one::<u8>(ARG_VERBOSITY).copied().unwrap_or(0) {
        0 => None,
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}
