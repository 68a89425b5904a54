use clap::{Arg, ArgMatches, Command};
use std::time::Duration;

use crate::auth::cache::MAX_CACHE_TTL;
use crate::auth::config::MAX_INACTIVE_SECONDS;
use crate::auth::AuthConfig;

pub const ARG_MAX_INACTIVE_SECONDS: &str = "max-inactive-seconds";
pub const ARG_SWEEP_INTERVAL_SECONDS: &str = "sweep-interval-seconds";
pub const ARG_CACHE_TTL_SECONDS: &str = "cache-ttl-seconds";
pub const ARG_CACHE_CAPACITY: &str = "cache-capacity";
pub const ARG_STORE_TIMEOUT_MS: &str = "store-timeout-ms";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_MAX_INACTIVE_SECONDS)
                .long(ARG_MAX_INACTIVE_SECONDS)
                .help("Idle time after which a ticket is swept, in seconds")
                .env("TESSERA_MAX_INACTIVE_SECONDS")
                .default_value("43200")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..=MAX_INACTIVE_SECONDS)),
        )
        .arg(
            Arg::new(ARG_SWEEP_INTERVAL_SECONDS)
                .long(ARG_SWEEP_INTERVAL_SECONDS)
                .help("Interval between expiry sweeps, in seconds")
                .env("TESSERA_SWEEP_INTERVAL_SECONDS")
                .default_value("60")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_CACHE_TTL_SECONDS)
                .long(ARG_CACHE_TTL_SECONDS)
                .help("Authentication cache TTL in seconds")
                .env("TESSERA_CACHE_TTL_SECONDS")
                .default_value("300")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(..=MAX_CACHE_TTL.as_secs())),
        )
        .arg(
            Arg::new(ARG_CACHE_CAPACITY)
                .long(ARG_CACHE_CAPACITY)
                .help("Maximum number of cached authentications")
                .env("TESSERA_CACHE_CAPACITY")
                .default_value("10000")
                .global(true)
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_STORE_TIMEOUT_MS)
                .long(ARG_STORE_TIMEOUT_MS)
                .help("Upper bound for a single store access, in milliseconds")
                .env("TESSERA_STORE_TIMEOUT_MS")
                .default_value("5000")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

/// Build an [`AuthConfig`] from the session arguments, keeping defaults for
/// anything absent.
#[must_use]
pub fn parse(matches: &ArgMatches) -> AuthConfig {
    let mut config = AuthConfig::new();

    if let Some(seconds) = matches.get_one::<u64>(ARG_MAX_INACTIVE_SECONDS) {
        config = config.with_max_inactive_seconds(*seconds);
    }
    if let Some(seconds) = matches.get_one::<u64>(ARG_SWEEP_INTERVAL_SECONDS) {
        config = config.with_sweep_interval_seconds(*seconds);
    }
    if let Some(seconds) = matches.get_one::<u64>(ARG_CACHE_TTL_SECONDS) {
        config = config.with_cache_ttl_seconds(*seconds);
    }
    if let Some(capacity) = matches.get_one::<u64>(ARG_CACHE_CAPACITY) {
        config = config.with_cache_capacity(*capacity);
    }
    if let Some(millis) = matches.get_one::<u64>(ARG_STORE_TIMEOUT_MS) {
        config = config.with_store_timeout(Duration::from_millis(*millis));
    }

    config
}
