pub mod add_user;
pub mod hash_password;
pub mod login;
pub mod migrate;
pub mod reaper;
pub mod sweep;

// Internal "interpreter" for `Action`.
mod run;

use crate::cli::globals::GlobalArgs;

#[derive(Debug)]
pub enum Action {
    Reaper(GlobalArgs),
    Sweep(GlobalArgs),
    Migrate(GlobalArgs),
    Login(login::Args),
    AddUser(add_user::Args),
    HashPassword(hash_password::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
