//! Authentication core.
//!
//! Flow Overview:
//! 1) [`CredentialValidator`] checks tenant + username + password against the
//!    stored profile hash.
//! 2) [`TicketStore`] issues an opaque ticket and records its last access.
//! 3) [`ProfileResolver`] maps identities and tickets back to profiles.
//! 4) [`AuthenticationCache`] remembers ticket -> authentication for a TTL.
//! 5) [`AuthenticationManager`] composes the above into login, lookup and
//!    logout; [`TicketReaper`] removes idle tickets in the background.

pub mod cache;
pub mod config;
pub mod error;
pub mod manager;
pub mod model;
pub mod password;
pub mod reaper;
pub mod resolver;
pub mod ticket;
pub mod validator;

pub use cache::{AuthenticationCache, MokaAuthenticationCache, NoopAuthenticationCache};
pub use config::AuthConfig;
pub use error::{AuthError, CredentialError, ResolveError};
pub use manager::AuthenticationManager;
pub use model::{Authentication, Identity, Profile, ProfileUpdate, Ticket};
pub use password::{Argon2Hasher, PasswordHasher};
pub use reaper::TicketReaper;
pub use resolver::ProfileResolver;
pub use ticket::{generate_ticket_id, TicketStore};
pub use validator::CredentialValidator;
