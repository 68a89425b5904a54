//! Failure kinds for each auth component and the single mapping onto the
//! caller-facing [`AuthError`].

use thiserror::Error;

use crate::store::StoreError;

/// Why a credential check failed.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("No such user")]
    NoSuchUser,
    #[error("User is disabled")]
    UserDisabled,
    #[error("Bad credentials")]
    BadCredentials,
    #[error("Password hash error: {0}")]
    Hash(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a ticket could not be resolved to a profile.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Normal "no active session" outcome.
    #[error("Ticket not found")]
    TicketNotFound,
    /// Referential integrity violation: the ticket outlived its profile.
    #[error("No profile '{identity}' found for valid ticket '{ticket}'")]
    ProfileMissing { ticket: String, identity: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors returned by [`AuthenticationManager`](super::AuthenticationManager).
///
/// A missing ticket is not an error; `get_authentication` returns `Ok(None)`.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong username or wrong password. The two are never distinguished.
    #[error("Invalid username or password")]
    BadCredentials,

    #[error("User '{username}' is disabled")]
    UserDisabled { username: String },

    /// Integrity violation, backing-store failure, or timeout.
    #[error("An unexpected error occurred while attempting to {operation}: {message}")]
    System {
        operation: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl AuthError {
    pub(crate) fn system(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::System {
            operation: operation.into(),
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn system_from<E>(operation: impl Into<String>, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::System {
            operation: operation.into(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Translate a credential failure for `username`.
    pub(crate) fn from_credentials(err: CredentialError, username: &str) -> Self {
        match err {
            CredentialError::NoSuchUser | CredentialError::BadCredentials => Self::BadCredentials,
            CredentialError::UserDisabled => Self::UserDisabled {
                username: username.to_string(),
            },
            other => Self::system_from(format!("authenticate user '{username}'"), other),
        }
    }

    #[must_use]
    pub fn is_system(&self) -> bool {
        matches!(self, Self::System { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_user_and_wrong_password_look_the_same() {
        let unknown = AuthError::from_credentials(CredentialError::NoSuchUser, "alice");
        let wrong = AuthError::from_credentials(CredentialError::BadCredentials, "alice");
        assert!(matches!(unknown, AuthError::BadCredentials));
        assert!(matches!(wrong, AuthError::BadCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[test]
    fn disabled_user_keeps_username() {
        let err = AuthError::from_credentials(CredentialError::UserDisabled, "alice");
        assert_eq!(err.to_string(), "User 'alice' is disabled");
    }

    #[test]
    fn store_failures_become_system_errors() {
        let err = AuthError::from_credentials(
            CredentialError::Store(StoreError::Unavailable("offline".to_string())),
            "alice",
        );
        assert!(err.is_system());
        assert!(err.to_string().contains("authenticate user 'alice'"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
