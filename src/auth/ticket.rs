//! Ticket issuance and lifecycle on top of a [`TicketRepository`].

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use rand::{rngs::OsRng, RngCore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::model::{Identity, Ticket};
use crate::store::{StoreError, StoreResult, TicketRepository};

const TICKET_ID_BYTES: usize = 32;
const ISSUE_ATTEMPTS: usize = 3;

/// Create a new ticket id: 32 bytes from the OS RNG, URL-safe base64 without padding.
///
/// # Errors
/// Returns an error if the OS RNG fails.
pub fn generate_ticket_id() -> StoreResult<String> {
    let mut bytes = [0u8; TICKET_ID_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| StoreError::Unavailable(format!("failed to generate ticket id: {err}")))?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

#[derive(Clone)]
pub struct TicketStore {
    repository: Arc<dyn TicketRepository>,
}

impl TicketStore {
    pub fn new(repository: Arc<dyn TicketRepository>) -> Self {
        Self { repository }
    }

    /// Persist a fresh ticket for `identity` and return its id.
    ///
    /// # Errors
    /// Returns an error if the repository fails, or if no unique id could be
    /// generated after a few attempts.
    #[instrument(skip(self))]
    pub async fn issue(&self, identity: &Identity) -> StoreResult<String> {
        for _ in 0..ISSUE_ATTEMPTS {
            let ticket = Ticket::new(generate_ticket_id()?, identity, Utc::now());
            match self.repository.insert(&ticket).await {
                Ok(()) => {
                    debug!("Ticket issued for '{identity}'");
                    return Ok(ticket.id);
                }
                Err(StoreError::Conflict(_)) => {
                    warn!("Ticket id collision for '{identity}', retrying");
                }
                Err(err) => return Err(err),
            }
        }

        Err(StoreError::Conflict(
            "failed to generate unique ticket id".to_string(),
        ))
    }

    /// # Errors
    /// Returns an error if the repository fails.
    pub async fn find(&self, ticket_id: &str) -> StoreResult<Option<Ticket>> {
        self.repository.find(ticket_id).await
    }

    /// Record activity on a ticket. A ticket that vanished concurrently is
    /// logged, not reported as an error.
    ///
    /// # Errors
    /// Returns an error if the repository fails.
    #[instrument(skip(self))]
    pub async fn touch(&self, ticket_id: &str) -> StoreResult<()> {
        if !self.repository.touch(ticket_id, Utc::now()).await? {
            warn!("Ticket '{ticket_id}' disappeared before its access time could be updated");
        }
        Ok(())
    }

    /// Remove a ticket. Deleting an absent ticket is not an error.
    ///
    /// # Errors
    /// Returns an error if the repository fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, ticket_id: &str) -> StoreResult<()> {
        if !self.repository.delete(ticket_id).await? {
            debug!("Ticket '{ticket_id}' was already gone");
        }
        Ok(())
    }

    /// Expiry sweep: delete every ticket idle for longer than `max_inactive`.
    ///
    /// # Errors
    /// Returns an error if the repository fails or `max_inactive` is out of range.
    #[instrument(skip(self))]
    pub async fn delete_older_than(&self, max_inactive: Duration) -> StoreResult<u64> {
        let window = chrono::Duration::from_std(max_inactive)
            .map_err(|err| StoreError::InvalidInput(format!("invalid inactivity window: {err}")))?;
        let cutoff = Utc::now().checked_sub_signed(window).ok_or_else(|| {
            StoreError::InvalidInput(format!("inactivity window {max_inactive:?} is out of range"))
        })?;
        let removed = self.repository.delete_last_access_before(cutoff).await?;
        if removed > 0 {
            info!("Removed {removed} ticket(s) idle since before {cutoff}");
        }
        Ok(removed)
    }

    /// # Errors
    /// Returns an error if the repository fails.
    pub async fn count(&self) -> StoreResult<u64> {
        self.repository.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTicketRepository;

    fn store() -> (TicketStore, Arc<MemoryTicketRepository>) {
        let repo = Arc::new(MemoryTicketRepository::new());
        (TicketStore::new(repo.clone()), repo)
    }

    #[test]
    fn ticket_ids_are_url_safe_and_random() {
        let first = generate_ticket_id().unwrap();
        let second = generate_ticket_id().unwrap();
        assert_ne!(first, second);
        assert_eq!(
            Base64UrlUnpadded::decode_vec(&first).map(|b| b.len()).ok(),
            Some(TICKET_ID_BYTES)
        );
        assert!(first
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[tokio::test]
    async fn issue_persists_with_equal_timestamps() {
        let (store, _) = store();
        let identity = Identity::new("alice", "tenantA");
        let id = store.issue(&identity).await.unwrap();
        let ticket = store.find(&id).await.ok().flatten();
        assert!(ticket.is_some());
        if let Some(ticket) = ticket {
            assert_eq!(ticket.identity(), identity);
            assert_eq!(ticket.issued_at, ticket.last_access_at);
        }
    }

    #[tokio::test]
    async fn touch_and_delete_are_idempotent() {
        let (store, _) = store();
        let id = store
            .issue(&Identity::new("alice", "tenantA"))
            .await
            .unwrap();

        assert!(store.touch(&id).await.is_ok());
        assert!(store.delete(&id).await.is_ok());
        assert!(store.delete(&id).await.is_ok());
        assert!(store.touch(&id).await.is_ok());
        assert_eq!(store.count().await.ok(), Some(0));
    }

    #[tokio::test]
    async fn delete_older_than_uses_last_access() {
        let (store, repo) = store();
        let now = Utc::now();
        let identity = Identity::new("alice", "tenantA");

        let mut stale = Ticket::new("stale".to_string(), &identity, now - chrono::Duration::hours(3));
        stale.last_access_at = now - chrono::Duration::hours(2);
        repo.insert(&stale).await.unwrap();

        // Old issue time but recent activity survives.
        let mut active = Ticket::new("active".to_string(), &identity, now - chrono::Duration::hours(3));
        active.last_access_at = now;
        repo.insert(&active).await.unwrap();

        let removed = store
            .delete_older_than(Duration::from_secs(60 * 60))
            .await
            .ok();
        assert_eq!(removed, Some(1));
        assert!(store.find("stale").await.ok().flatten().is_none());
        assert!(store.find("active").await.ok().flatten().is_some());
    }

    #[tokio::test]
    async fn delete_older_than_rejects_unrepresentable_windows() {
        let (store, _) = store();
        store
            .issue(&Identity::new("alice", "tenantA"))
            .await
            .unwrap();

        let result = store
            .delete_older_than(Duration::from_secs(10_000_000_000_000))
            .await;
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));
        let result = store.delete_older_than(Duration::MAX).await;
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn issue_surfaces_store_failures() {
        let (store, repo) = store();
        repo.set_unavailable(true);
        assert!(matches!(
            store.issue(&Identity::new("alice", "tenantA")).await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
