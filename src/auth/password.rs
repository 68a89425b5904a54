//! Pluggable one-way password hashing.

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

use super::error::CredentialError;

pub trait PasswordHasher: Send + Sync {
    /// Produce a self-describing hash string for `plaintext`.
    ///
    /// # Errors
    /// Returns [`CredentialError::Hash`] if hashing fails.
    fn hash(&self, plaintext: &str) -> Result<String, CredentialError>;

    /// Check `plaintext` against a hash produced by [`PasswordHasher::hash`].
    ///
    /// # Errors
    /// Returns [`CredentialError::Hash`] if `hashed` cannot be parsed.
    fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool, CredentialError>;
}

/// Argon2id with the crate's default parameters, stored in PHC string format.
#[derive(Clone, Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Argon2id with explicit cost parameters.
    ///
    /// # Errors
    /// Returns [`CredentialError::Hash`] if the parameters are out of range.
    pub fn with_params(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, CredentialError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|err| CredentialError::Hash(err.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| CredentialError::Hash(err.to_string()))
    }

    fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool, CredentialError> {
        let parsed =
            PasswordHash::new(hashed).map_err(|err| CredentialError::Hash(err.to_string()))?;
        match self.argon2.verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(err) => Err(CredentialError::Hash(err.to_string())),
        }
    }
}
