//! Tuning knobs for the session lifecycle.

use std::time::Duration;

use super::cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL, MAX_CACHE_TTL};

const DEFAULT_MAX_INACTIVE_SECONDS: u64 = 12 * 60 * 60;
const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 60;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

/// Upper bound for the inactivity window (ten years).
pub const MAX_INACTIVE_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    cache_ttl: Duration,
    cache_capacity: u64,
    max_inactive: Duration,
    sweep_interval: Duration,
    store_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_inactive: Duration::from_secs(DEFAULT_MAX_INACTIVE_SECONDS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECONDS),
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
        }
    }

    /// TTL values above [`MAX_CACHE_TTL`] are clamped.
    #[must_use]
    pub fn with_cache_ttl_seconds(mut self, seconds: u64) -> Self {
        self.cache_ttl = Duration::from_secs(seconds).min(MAX_CACHE_TTL);
        self
    }

    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_max_inactive_seconds(mut self, seconds: u64) -> Self {
        self.max_inactive = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_sweep_interval_seconds(mut self, seconds: u64) -> Self {
        self.sweep_interval = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    #[must_use]
    pub fn cache_capacity(&self) -> u64 {
        self.cache_capacity
    }

    /// Idle time after which the expiry sweep removes a ticket.
    #[must_use]
    pub fn max_inactive(&self) -> Duration {
        self.max_inactive
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Upper bound for any single store or profile access.
    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }
}
