use crate::auth::{Argon2Hasher, PasswordHasher, Profile};
use crate::cli::globals::GlobalArgs;
use crate::store::{PgProfileRepository, ProfileRepository};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub tenant: String,
    pub username: String,
    pub email: String,
    pub password: SecretString,
}

/// Create a profile and print its id.
/// # Errors
/// Returns an error if hashing fails, the username is taken in the tenant, or
/// the database is unreachable.
pub async fn execute(args: Args) -> Result<()> {
    let hashed = Argon2Hasher::new().hash(args.password.expose_secret())?;
    let profile = Profile::new(&args.username, &args.tenant, &args.email, hashed);

    let pool = args.globals.connect().await?;
    PgProfileRepository::new(pool.clone())
        .save(&profile)
        .await
        .with_context(|| format!("failed to create user '{}'", profile.identity()))?;
    info!("Created profile '{}' for '{}'", profile.id, profile.identity());
    println!("{}", profile.id);

    pool.close().await;
    Ok(())
}
