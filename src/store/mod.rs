//! Persistence seams for tickets and profiles.
//!
//! The auth core talks to storage only through [`TicketRepository`] and
//! [`ProfileRepository`]. Two backends are provided: [`memory`] for tests and
//! single-process deployments, and [`postgres`] for durable storage.

pub mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::model::{Profile, Ticket};

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryProfileRepository, MemoryTicketRepository};
pub use postgres::{PgProfileRepository, PgTicketRepository};

#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Persist a new ticket. Fails with [`StoreError::Conflict`] if the id is taken.
    async fn insert(&self, ticket: &Ticket) -> StoreResult<()>;

    async fn find(&self, id: &str) -> StoreResult<Option<Ticket>>;

    /// Set `last_access_at`. Returns `false` when the ticket no longer exists.
    async fn touch(&self, id: &str, at: DateTime<Utc>) -> StoreResult<bool>;

    /// Returns `false` when there was nothing to delete.
    async fn delete(&self, id: &str) -> StoreResult<bool>;

    /// Delete every ticket whose `last_access_at` is strictly before `cutoff`.
    async fn delete_last_access_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;

    async fn count(&self) -> StoreResult<u64>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_username_and_tenant(
        &self,
        username: &str,
        tenant_name: &str,
    ) -> StoreResult<Option<Profile>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Profile>>;

    /// Insert or replace a profile, keyed by id.
    ///
    /// Fails with [`StoreError::Conflict`] if another profile already owns the
    /// `(tenant, username)` pair.
    async fn save(&self, profile: &Profile) -> StoreResult<()>;
}
