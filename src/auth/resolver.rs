//! Resolve identities and tickets to profiles.

use std::sync::Arc;
use tracing::{debug, error, instrument};

use super::error::ResolveError;
use super::model::{Identity, Profile};
use super::ticket::TicketStore;
use crate::store::{ProfileRepository, StoreResult};

#[derive(Clone)]
pub struct ProfileResolver {
    profiles: Arc<dyn ProfileRepository>,
    tickets: TicketStore,
}

impl ProfileResolver {
    pub fn new(profiles: Arc<dyn ProfileRepository>, tickets: TicketStore) -> Self {
        Self { profiles, tickets }
    }

    /// # Errors
    /// Returns an error if the profile repository fails.
    pub async fn resolve_by_identity(&self, identity: &Identity) -> StoreResult<Option<Profile>> {
        self.profiles
            .find_by_username_and_tenant(identity.username(), identity.tenant_name())
            .await
    }

    /// Look up the ticket, then the profile it names.
    ///
    /// # Errors
    /// - [`ResolveError::TicketNotFound`] when the ticket does not exist.
    /// - [`ResolveError::ProfileMissing`] when the ticket exists but its profile does not.
    /// - [`ResolveError::Store`] on backend failures.
    #[instrument(skip(self))]
    pub async fn resolve_by_ticket(&self, ticket_id: &str) -> Result<Profile, ResolveError> {
        let Some(ticket) = self.tickets.find(ticket_id).await? else {
            debug!("Ticket '{ticket_id}' is invalid");
            return Err(ResolveError::TicketNotFound);
        };

        let identity = ticket.identity();
        match self.resolve_by_identity(&identity).await? {
            Some(profile) => {
                debug!("Profile '{}' retrieved for ticket '{ticket_id}'", profile.id);
                Ok(profile)
            }
            None => {
                error!("No profile '{identity}' found for valid ticket '{ticket_id}'");
                Err(ResolveError::ProfileMissing {
                    ticket: ticket_id.to_string(),
                    identity: identity.to_string(),
                })
            }
        }
    }

    /// Like [`resolve_by_ticket`](Self::resolve_by_ticket), keeping only the
    /// named attributes.
    ///
    /// # Errors
    /// Same as [`resolve_by_ticket`](Self::resolve_by_ticket).
    pub async fn resolve_by_ticket_with_attributes<S: AsRef<str> + Sync>(
        &self,
        ticket_id: &str,
        attributes: &[S],
    ) -> Result<Profile, ResolveError> {
        self.resolve_by_ticket(ticket_id)
            .await
            .map(|profile| profile.with_attributes_only(attributes))
    }
}
