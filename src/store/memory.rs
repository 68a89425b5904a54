//! In-process repositories backed by `parking_lot` locks.
//!
//! Each operation takes the lock once, so single-key reads and writes are
//! atomic. Both repositories can be switched into an "unavailable" mode and
//! given artificial latency to exercise failure and timeout paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use uuid::Uuid;

use super::{ProfileRepository, StoreError, StoreResult, TicketRepository};
use crate::auth::model::{Profile, Ticket};

#[derive(Debug, Default)]
struct Faults {
    unavailable: AtomicBool,
    latency_ms: AtomicU64,
}

impl Faults {
    async fn check(&self, backend: &str) -> StoreResult<()> {
        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable(format!("{backend} is offline")));
        }
        Ok(())
    }

    fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
pub struct MemoryTicketRepository {
    tickets: RwLock<HashMap<String, Ticket>>,
    faults: Faults,
}

impl MemoryTicketRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.set_unavailable(unavailable);
    }

    /// Delay every following call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.faults.set_latency(latency);
    }
}

#[async_trait]
impl TicketRepository for MemoryTicketRepository {
    async fn insert(&self, ticket: &Ticket) -> StoreResult<()> {
        self.faults.check("ticket store").await?;
        let mut tickets = self.tickets.write();
        if tickets.contains_key(&ticket.id) {
            return Err(StoreError::Conflict("ticket id already exists".to_string()));
        }
        tickets.insert(ticket.id.clone(), ticket.clone());
        Ok(())
    }

    async fn find(&self, id: &str) -> StoreResult<Option<Ticket>> {
        self.faults.check("ticket store").await?;
        Ok(self.tickets.read().get(id).cloned())
    }

    async fn touch(&self, id: &str, at: DateTime<Utc>) -> StoreResult<bool> {
        self.faults.check("ticket store").await?;
        Ok(self
            .tickets
            .write()
            .get_mut(id)
            .map(|ticket| ticket.last_access_at = at)
            .is_some())
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.faults.check("ticket store").await?;
        Ok(self.tickets.write().remove(id).is_some())
    }

    async fn delete_last_access_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        self.faults.check("ticket store").await?;
        let mut tickets = self.tickets.write();
        let before = tickets.len();
        tickets.retain(|_, ticket| ticket.last_access_at >= cutoff);
        Ok(u64::try_from(before - tickets.len()).unwrap_or(u64::MAX))
    }

    async fn count(&self) -> StoreResult<u64> {
        self.faults.check("ticket store").await?;
        Ok(u64::try_from(self.tickets.read().len()).unwrap_or(u64::MAX))
    }
}

#[derive(Debug, Default)]
struct Profiles {
    by_id: HashMap<Uuid, Profile>,
    by_name: HashMap<(String, String), Uuid>,
}

#[derive(Debug, Default)]
pub struct MemoryProfileRepository {
    profiles: RwLock<Profiles>,
    faults: Faults,
}

impl MemoryProfileRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a profile outright. Returns whether it existed.
    pub fn remove(&self, id: Uuid) -> bool {
        let mut profiles = self.profiles.write();
        match profiles.by_id.remove(&id) {
            Some(profile) => {
                profiles
                    .by_name
                    .remove(&(profile.tenant_name, profile.username));
                true
            }
            None => false,
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.set_unavailable(unavailable);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.faults.set_latency(latency);
    }
}

#[async_trait]
impl ProfileRepository for MemoryProfileRepository {
    async fn find_by_username_and_tenant(
        &self,
        username: &str,
        tenant_name: &str,
    ) -> StoreResult<Option<Profile>> {
        self.faults.check("profile store").await?;
        let profiles = self.profiles.read();
        Ok(profiles
            .by_name
            .get(&(tenant_name.to_string(), username.to_string()))
            .and_then(|id| profiles.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        self.faults.check("profile store").await?;
        Ok(self.profiles.read().by_id.get(&id).cloned())
    }

    async fn save(&self, profile: &Profile) -> StoreResult<()> {
        self.faults.check("profile store").await?;
        let key = (profile.tenant_name.clone(), profile.username.clone());
        let mut profiles = self.profiles.write();

        if let Some(owner) = profiles.by_name.get(&key) {
            if *owner != profile.id {
                return Err(StoreError::Conflict(format!(
                    "username '{}' already exists in tenant '{}'",
                    profile.username, profile.tenant_name
                )));
            }
        }

        if let Some(previous) = profiles.by_id.insert(profile.id, profile.clone()) {
            profiles
                .by_name
                .remove(&(previous.tenant_name, previous.username));
        }
        profiles.by_name.insert(key, profile.id);
        Ok(())
    }
}
