//! Username/password checks against stored profile hashes.
//!
//! Argon2 work runs on the blocking pool. An unknown username still pays for
//! one verification against a dummy hash, so both failure paths cost the same.

use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

use super::error::CredentialError;
use super::model::Identity;
use super::password::PasswordHasher;
use crate::store::ProfileRepository;

const DUMMY_PASSWORD: &str = "tessera-dummy-password";

pub struct CredentialValidator {
    profiles: Arc<dyn ProfileRepository>,
    hasher: Arc<dyn PasswordHasher>,
    dummy_hash: OnceCell<String>,
}

impl CredentialValidator {
    pub fn new(profiles: Arc<dyn ProfileRepository>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            profiles,
            hasher,
            dummy_hash: OnceCell::new(),
        }
    }

    /// Validate `password` for `username` within `tenant`.
    ///
    /// The disabled check runs before the password check, so a disabled user
    /// is reported as disabled regardless of the password supplied.
    ///
    /// # Errors
    /// - [`CredentialError::NoSuchUser`] if no profile matches.
    /// - [`CredentialError::UserDisabled`] if the profile is inactive.
    /// - [`CredentialError::BadCredentials`] if the password does not match.
    /// - [`CredentialError::Store`] / [`CredentialError::Hash`] on backend failures.
    #[instrument(skip(self, password))]
    pub async fn validate(
        &self,
        tenant: &str,
        username: &str,
        password: &SecretString,
    ) -> Result<Identity, CredentialError> {
        let Some(profile) = self
            .profiles
            .find_by_username_and_tenant(username, tenant)
            .await?
        else {
            debug!("No profile for user '{username}' in tenant '{tenant}'");
            if let Err(err) = self.verify_dummy(password).await {
                warn!("Dummy password verification failed: {err}");
            }
            return Err(CredentialError::NoSuchUser);
        };

        if !profile.active {
            debug!("Profile '{}' is disabled", profile.id);
            return Err(CredentialError::UserDisabled);
        }

        if !self
            .verify(password, profile.hashed_password.clone())
            .await?
        {
            debug!("Password mismatch for profile '{}'", profile.id);
            return Err(CredentialError::BadCredentials);
        }

        Ok(profile.identity())
    }

    async fn verify(&self, password: &SecretString, hashed: String) -> Result<bool, CredentialError> {
        let hasher = self.hasher.clone();
        let password = password.clone();
        tokio::task::spawn_blocking(move || hasher.verify(password.expose_secret(), &hashed))
            .await
            .map_err(|err| CredentialError::Hash(format!("password verification task failed: {err}")))?
    }

    async fn verify_dummy(&self, password: &SecretString) -> Result<bool, CredentialError> {
        let dummy = self
            .dummy_hash
            .get_or_try_init(|| {
                let hasher = self.hasher.clone();
                async move {
                    tokio::task::spawn_blocking(move || hasher.hash(DUMMY_PASSWORD))
                        .await
                        .map_err(|err| {
                            CredentialError::Hash(format!("dummy hash task failed: {err}"))
                        })?
                }
            })
            .await?;
        self.verify(password, dummy.clone()).await
    }
}
