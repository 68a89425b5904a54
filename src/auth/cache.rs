//! Ticket → authentication cache.
//!
//! The cache is an optimization only: the ticket and profile stores stay
//! authoritative, and [`NoopAuthenticationCache`] (always miss) must produce
//! the same outcomes as [`MokaAuthenticationCache`], only slower.
//!
//! # Cache Strategy
//!
//! - **TTL**: entries expire `ttl` after insertion, independently of ticket expiry.
//! - **Capacity**: bounded entry count with `moka`'s TinyLFU eviction.
//! - **Atomicity**: per-key `get`/`put`/`remove` are atomic; last writer wins.

use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;

use super::model::Authentication;

/// Default cache TTL (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default maximum cache capacity.
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Longest accepted TTL (one year); longer values are clamped.
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[async_trait]
pub trait AuthenticationCache: Send + Sync {
    async fn get(&self, ticket_id: &str) -> Option<Authentication>;
    async fn put(&self, ticket_id: &str, authentication: Authentication);
    async fn remove(&self, ticket_id: &str);
    /// Drop every entry.
    fn clear(&self);
    /// Approximate number of live entries.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone)]
pub struct MokaAuthenticationCache {
    cache: Cache<String, Authentication>,
}

impl MokaAuthenticationCache {
    #[must_use]
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl.min(MAX_CACHE_TTL))
                .build(),
        }
    }

    /// Flush pending maintenance so [`AuthenticationCache::len`] is exact.
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl Default for MokaAuthenticationCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL, DEFAULT_CACHE_CAPACITY)
    }
}

#[async_trait]
impl AuthenticationCache for MokaAuthenticationCache {
    async fn get(&self, ticket_id: &str) -> Option<Authentication> {
        self.cache.get(ticket_id).await
    }

    async fn put(&self, ticket_id: &str, authentication: Authentication) {
        self.cache.insert(ticket_id.to_string(), authentication).await;
    }

    async fn remove(&self, ticket_id: &str) {
        self.cache.invalidate(ticket_id).await;
    }

    fn clear(&self) {
        self.cache.invalidate_all();
    }

    fn len(&self) -> u64 {
        self.cache.entry_count()
    }
}

/// A cache that never holds anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAuthenticationCache;

#[async_trait]
impl AuthenticationCache for NoopAuthenticationCache {
    async fn get(&self, _ticket_id: &str) -> Option<Authentication> {
        None
    }

    async fn put(&self, _ticket_id: &str, _authentication: Authentication) {}

    async fn remove(&self, _ticket_id: &str) {}

    fn clear(&self) {}

    fn len(&self) -> u64 {
        0
    }
}
