//! Session lifecycle orchestration.
//!
//! Flow Overview:
//! 1) `authenticate_user`: validate credentials, issue a ticket, resolve the
//!    profile, cache the result.
//! 2) `get_authentication`: answer from the cache unless a reload is forced;
//!    otherwise resolve ticket + profile, touch the ticket, refresh the cache.
//! 3) `invalidate_authentication`: drop the cache entry and delete the ticket.
//!
//! Concurrency: the stores are authoritative and treated as external services;
//! the only shared state held here is the cache and an invalidation
//! generation counter. A resolution that overlaps an invalidation still
//! returns its result but never writes it into the cache.
//!
//! Profiles disabled after a ticket was issued keep resolving. Revocation is
//! done by invalidating the ticket.

use secrecy::SecretString;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

use super::cache::AuthenticationCache;
use super::config::AuthConfig;
use super::error::{AuthError, ResolveError};
use super::model::Authentication;
use super::password::PasswordHasher;
use super::resolver::ProfileResolver;
use super::ticket::TicketStore;
use super::validator::CredentialValidator;
use crate::store::{ProfileRepository, TicketRepository};

pub struct AuthenticationManager {
    validator: CredentialValidator,
    tickets: TicketStore,
    resolver: ProfileResolver,
    cache: Arc<dyn AuthenticationCache>,
    store_timeout: Duration,
    invalidation_gen: AtomicU64,
}

impl AuthenticationManager {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        tickets: Arc<dyn TicketRepository>,
        hasher: Arc<dyn PasswordHasher>,
        cache: Arc<dyn AuthenticationCache>,
        config: &AuthConfig,
    ) -> Self {
        let tickets = TicketStore::new(tickets);
        Self {
            validator: CredentialValidator::new(profiles.clone(), hasher),
            resolver: ProfileResolver::new(profiles, tickets.clone()),
            tickets,
            cache,
            store_timeout: config.store_timeout(),
            invalidation_gen: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn tickets(&self) -> &TicketStore {
        &self.tickets
    }

    #[must_use]
    pub fn resolver(&self) -> &ProfileResolver {
        &self.resolver
    }

    #[must_use]
    pub fn cache(&self) -> &dyn AuthenticationCache {
        self.cache.as_ref()
    }

    /// Validate credentials and open a session.
    ///
    /// Exactly one ticket is persisted on success and none on failure.
    ///
    /// # Errors
    /// - [`AuthError::BadCredentials`] for an unknown user or a wrong password.
    /// - [`AuthError::UserDisabled`] for an inactive profile.
    /// - [`AuthError::System`] for store failures and timeouts.
    #[instrument(skip(self, password))]
    pub async fn authenticate_user(
        &self,
        tenant: &str,
        username: &str,
        password: &SecretString,
    ) -> Result<Authentication, AuthError> {
        let operation = format!("authenticate user '{username}'");

        let identity = self
            .within(&operation, self.validator.validate(tenant, username, password))
            .await?
            .map_err(|err| log_system(AuthError::from_credentials(err, username)))?;

        let ticket = self
            .within(&operation, self.tickets.issue(&identity))
            .await?
            .map_err(|err| log_system(AuthError::system_from(operation.as_str(), err)))?;

        let resolved = match self
            .within(&operation, self.resolver.resolve_by_identity(&identity))
            .await
        {
            Ok(Ok(Some(profile))) => Ok(profile),
            Ok(Ok(None)) => Err(AuthError::system(
                operation.as_str(),
                format!("profile '{identity}' disappeared during authentication"),
            )),
            Ok(Err(err)) => Err(AuthError::system_from(operation.as_str(), err)),
            Err(err) => Err(err),
        };
        let profile = match resolved {
            Ok(profile) => profile,
            Err(err) => {
                // Don't leave an orphan ticket behind.
                self.discard_ticket(&ticket).await;
                return Err(log_system(err));
            }
        };

        let authentication = Authentication::new(ticket.clone(), profile);
        self.cache.put(&ticket, authentication.clone()).await;

        debug!("Authentication successful for user '{username}' (ticket ID = '{ticket}')");

        Ok(authentication)
    }

    /// Resolve a ticket to its authentication.
    ///
    /// Returns `Ok(None)` when the ticket does not exist (never issued,
    /// invalidated, or swept). A cache hit returns immediately without
    /// touching the ticket.
    ///
    /// # Errors
    /// Returns [`AuthError::System`] when the ticket exists but its profile does
    /// not, or when a store fails or times out.
    #[instrument(skip(self))]
    pub async fn get_authentication(
        &self,
        ticket: &str,
        force_reload: bool,
    ) -> Result<Option<Authentication>, AuthError> {
        if force_reload {
            debug!("Profile reload forced for ticket '{ticket}'");
        } else if let Some(authentication) = self.cache.get(ticket).await {
            return Ok(Some(authentication));
        } else {
            debug!("Ticket '{ticket}' found in request but there's no cached authentication for it");
        }

        let generation = self.invalidation_gen.load(Ordering::Acquire);
        let operation = format!("retrieve profile for ticket '{ticket}'");

        let profile = match self
            .within(&operation, self.resolver.resolve_by_ticket(ticket))
            .await?
        {
            Ok(profile) => profile,
            Err(ResolveError::TicketNotFound) => {
                // A reload may find the ticket swept while a stale entry is still cached.
                self.cache.remove(ticket).await;
                return Ok(None);
            }
            Err(err) => return Err(log_system(AuthError::system_from(operation.as_str(), err))),
        };

        self.within(&operation, self.tickets.touch(ticket))
            .await?
            .map_err(|err| log_system(AuthError::system_from(operation.as_str(), err)))?;

        let authentication = Authentication::new(ticket.to_string(), profile);
        if self.invalidation_gen.load(Ordering::Acquire) == generation {
            self.cache.put(ticket, authentication.clone()).await;
        } else {
            debug!("Invalidation overlapped resolution of ticket '{ticket}', not caching");
        }

        Ok(Some(authentication))
    }

    /// End the session behind `authentication`. Safe to call repeatedly.
    ///
    /// # Errors
    /// Returns [`AuthError::System`] if the ticket could not be deleted. The
    /// cache entry is removed either way.
    pub async fn invalidate_authentication(
        &self,
        authentication: &Authentication,
    ) -> Result<(), AuthError> {
        self.invalidate_ticket(authentication.ticket()).await
    }

    /// Same as [`invalidate_authentication`](Self::invalidate_authentication),
    /// by ticket id.
    ///
    /// # Errors
    /// Returns [`AuthError::System`] if the ticket could not be deleted.
    #[instrument(skip(self))]
    pub async fn invalidate_ticket(&self, ticket: &str) -> Result<(), AuthError> {
        let operation = format!("invalidate ticket '{ticket}'");

        self.cache.remove(ticket).await;
        let deleted = self
            .within(&operation, self.tickets.delete(ticket))
            .await
            .and_then(|result| {
                result.map_err(|err| AuthError::system_from(operation.as_str(), err))
            });

        // Resolutions that started before the delete must not re-cache the ticket.
        self.invalidation_gen.fetch_add(1, Ordering::AcqRel);
        self.cache.remove(ticket).await;

        deleted.map_err(log_system)?;
        debug!("Ticket '{ticket}' successfully invalidated");
        Ok(())
    }

    /// Run one expiry sweep with the given inactivity window.
    ///
    /// When anything was removed the whole cache is dropped, so swept tickets
    /// stop resolving right away. Sweeps run by a standalone
    /// [`TicketReaper`](super::reaper::TicketReaper) leave the cache alone and
    /// rely on its TTL.
    ///
    /// # Errors
    /// Returns [`AuthError::System`] if the sweep fails or times out.
    pub async fn sweep_expired(&self, max_inactive: Duration) -> Result<u64, AuthError> {
        let operation = "sweep expired tickets";
        let removed = self
            .within(operation, self.tickets.delete_older_than(max_inactive))
            .await?
            .map_err(|err| log_system(AuthError::system_from(operation, err)))?;

        if removed > 0 {
            self.invalidation_gen.fetch_add(1, Ordering::AcqRel);
            self.cache.clear();
        }
        Ok(removed)
    }

    async fn discard_ticket(&self, ticket: &str) {
        match tokio::time::timeout(self.store_timeout, self.tickets.delete(ticket)).await {
            Ok(Ok(())) => debug!("Discarded ticket '{ticket}'"),
            Ok(Err(err)) => warn!("Failed to discard ticket '{ticket}': {err}"),
            Err(_) => warn!("Timed out discarding ticket '{ticket}'"),
        }
    }

    async fn within<F: Future>(&self, operation: &str, future: F) -> Result<F::Output, AuthError> {
        tokio::time::timeout(self.store_timeout, future)
            .await
            .map_err(|_| {
                log_system(AuthError::system(
                    operation,
                    format!("store access timed out after {:?}", self.store_timeout),
                ))
            })
    }
}

fn log_system(err: AuthError) -> AuthError {
    if err.is_system() {
        error!("{err}");
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::cache::MokaAuthenticationCache;
    use crate::auth::model::Profile;
    use crate::auth::password::Argon2Hasher;
    use crate::store::{MemoryProfileRepository, MemoryTicketRepository};

    struct Fixture {
        manager: AuthenticationManager,
        profiles: Arc<MemoryProfileRepository>,
        tickets: Arc<MemoryTicketRepository>,
        alice: Profile,
    }

    async fn fixture(config: AuthConfig) -> Fixture {
        let hasher = Arc::new(Argon2Hasher::with_params(1024, 1, 1).unwrap());
        let profiles = Arc::new(MemoryProfileRepository::new());
        let tickets = Arc::new(MemoryTicketRepository::new());
        let alice = Profile::new(
            "alice",
            "tenantA",
            "alice@example.com",
            hasher.hash("password").unwrap(),
        );
        profiles.save(&alice).await.unwrap();
        let manager = AuthenticationManager::new(
            profiles.clone(),
            tickets.clone(),
            hasher,
            Arc::new(MokaAuthenticationCache::default()),
            &config,
        );
        Fixture {
            manager,
            profiles,
            tickets,
            alice,
        }
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[tokio::test]
    async fn authenticate_caches_the_result() {
        let f = fixture(AuthConfig::new()).await;
        let auth = f
            .manager
            .authenticate_user("tenantA", "alice", &secret("password"))
            .await;
        assert!(auth.is_ok());
        let Ok(auth) = auth else { return };

        assert_eq!(auth.profile(), &f.alice);
        assert_eq!(f.manager.cache().get(auth.ticket()).await, Some(auth.clone()));
        assert_eq!(f.tickets.count().await.ok(), Some(1));
    }

    #[tokio::test]
    async fn cache_hit_does_not_touch_the_ticket() {
        let f = fixture(AuthConfig::new()).await;
        let Ok(auth) = f
            .manager
            .authenticate_user("tenantA", "alice", &secret("password"))
            .await
        else {
            panic!("authentication failed");
        };
        let before = f.tickets.find(auth.ticket()).await.ok().flatten();

        tokio::time::sleep(Duration::from_millis(5)).await;
        let hit = f.manager.get_authentication(auth.ticket(), false).await;
        assert_eq!(hit.ok().flatten(), Some(auth.clone()));
        let after_hit = f.tickets.find(auth.ticket()).await.ok().flatten();
        assert_eq!(before, after_hit);

        let reload = f.manager.get_authentication(auth.ticket(), true).await;
        assert_eq!(reload.ok().flatten(), Some(auth.clone()));
        let after_reload = f.tickets.find(auth.ticket()).await.ok().flatten();
        assert!(
            after_reload.map(|t| t.last_access_at) > before.map(|t| t.last_access_at),
            "a forced reload records access"
        );
    }

    #[tokio::test]
    async fn reload_picks_up_profile_changes() {
        let f = fixture(AuthConfig::new()).await;
        let Ok(auth) = f
            .manager
            .authenticate_user("tenantA", "alice", &secret("password"))
            .await
        else {
            panic!("authentication failed");
        };

        let mut changed = f.alice.clone();
        changed.email = "alice@new.example.com".to_string();
        f.profiles.save(&changed).await.unwrap();

        let cached = f.manager.get_authentication(auth.ticket(), false).await;
        assert_eq!(
            cached.ok().flatten().map(|a| a.profile().email.clone()),
            Some("alice@example.com".to_string())
        );

        let reloaded = f.manager.get_authentication(auth.ticket(), true).await;
        assert_eq!(
            reloaded.ok().flatten().map(|a| a.profile().email.clone()),
            Some("alice@new.example.com".to_string())
        );

        // The reload refreshed the cache too.
        let cached = f.manager.get_authentication(auth.ticket(), false).await;
        assert_eq!(
            cached.ok().flatten().map(|a| a.profile().email.clone()),
            Some("alice@new.example.com".to_string())
        );
    }

    #[tokio::test]
    async fn disabled_after_issue_still_resolves() {
        let f = fixture(AuthConfig::new()).await;
        let Ok(auth) = f
            .manager
            .authenticate_user("tenantA", "alice", &secret("password"))
            .await
        else {
            panic!("authentication failed");
        };

        let mut disabled = f.alice.clone();
        disabled.active = false;
        f.profiles.save(&disabled).await.unwrap();

        let reloaded = f.manager.get_authentication(auth.ticket(), true).await;
        assert_eq!(reloaded.ok().flatten().map(|a| a.profile().active), Some(false));
    }

    #[tokio::test]
    async fn ticket_without_profile_is_a_system_error() {
        let f = fixture(AuthConfig::new()).await;
        let Ok(auth) = f
            .manager
            .authenticate_user("tenantA", "alice", &secret("password"))
            .await
        else {
            panic!("authentication failed");
        };
        f.profiles.remove(f.alice.id);

        let result = f.manager.get_authentication(auth.ticket(), true).await;
        assert!(matches!(result, Err(AuthError::System { .. })));
    }

    #[tokio::test]
    async fn invalidate_removes_cache_even_when_delete_fails() {
        let f = fixture(AuthConfig::new()).await;
        let Ok(auth) = f
            .manager
            .authenticate_user("tenantA", "alice", &secret("password"))
            .await
        else {
            panic!("authentication failed");
        };

        f.tickets.set_unavailable(true);
        let result = f.manager.invalidate_authentication(&auth).await;
        assert!(matches!(result, Err(AuthError::System { .. })));
        assert!(f.manager.cache().get(auth.ticket()).await.is_none());

        f.tickets.set_unavailable(false);
        assert!(f.manager.invalidate_authentication(&auth).await.is_ok());
        assert_eq!(f.tickets.count().await.ok(), Some(0));
    }

    #[tokio::test]
    async fn slow_store_times_out_as_system_error() {
        let f = fixture(AuthConfig::new().with_store_timeout(Duration::from_millis(100))).await;
        let Ok(auth) = f
            .manager
            .authenticate_user("tenantA", "alice", &secret("password"))
            .await
        else {
            panic!("authentication failed");
        };

        f.tickets.set_latency(Duration::from_millis(500));
        let result = f.manager.get_authentication(auth.ticket(), true).await;
        assert!(matches!(result, Err(AuthError::System { .. })));

        // Cache hits never reach the store.
        let hit = f.manager.get_authentication(auth.ticket(), false).await;
        assert_eq!(hit.ok().flatten(), Some(auth));
    }

    #[tokio::test]
    async fn profile_store_failure_during_login_is_a_system_error() {
        let f = fixture(AuthConfig::new()).await;
        f.profiles.set_unavailable(true);
        let result = f
            .manager
            .authenticate_user("tenantA", "alice", &secret("password"))
            .await;
        assert!(matches!(result, Err(AuthError::System { .. })));
        assert_eq!(f.tickets.count().await.ok(), Some(0));
    }

    #[tokio::test]
    async fn forced_reload_of_swept_ticket_drops_stale_cache_entry() {
        let f = fixture(AuthConfig::new()).await;
        let Ok(auth) = f
            .manager
            .authenticate_user("tenantA", "alice", &secret("password"))
            .await
        else {
            panic!("authentication failed");
        };

        f.tickets.delete(auth.ticket()).await.unwrap();
        let reload = f.manager.get_authentication(auth.ticket(), true).await;
        assert!(matches!(reload, Ok(None)));
        let hit = f.manager.get_authentication(auth.ticket(), false).await;
        assert!(matches!(hit, Ok(None)));
    }
}
