//! Command-line front end: parse arguments, set up telemetry, then hand an
//! [`Action`] back to the binary.

pub mod actions;
pub mod commands;
pub mod dispatch;
pub mod globals;
pub mod telemetry;

use anyhow::Result;

use self::actions::Action;

/// # Errors
/// Returns an error if telemetry cannot be initialized or the arguments do
/// not describe a runnable action.
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();
    telemetry::init(commands::logging::level(&matches))?;
    dispatch::handler(&matches)
}
