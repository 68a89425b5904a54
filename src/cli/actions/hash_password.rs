use crate::auth::{Argon2Hasher, PasswordHasher};
use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};

#[derive(Debug)]
pub struct Args {
    pub password: SecretString,
}

/// # Errors
/// Returns an error if hashing fails.
pub fn execute(args: &Args) -> Result<()> {
    println!("{}", Argon2Hasher::new().hash(args.password.expose_secret())?);
    Ok(())
}
