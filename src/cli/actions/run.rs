use crate::cli::actions::{add_user, hash_password, login, migrate, reaper, sweep, Action};
use anyhow::Result;

/// Execute the provided action.
// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Reaper(globals) => reaper::execute(globals).await,
        Action::Sweep(globals) => sweep::execute(globals).await,
        Action::Migrate(globals) => migrate::execute(globals).await,
        Action::Login(args) => login::execute(args).await,
        Action::AddUser(args) => add_user::execute(args).await,
        Action::HashPassword(args) => hash_password::execute(&args),
    }
}
