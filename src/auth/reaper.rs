//! Periodic expiry sweep.
//!
//! Runs [`TicketStore::delete_older_than`] on a fixed interval until
//! cancelled. A failed sweep is logged and retried on the next tick; a single
//! failure never stops the loop.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use super::config::AuthConfig;
use super::ticket::TicketStore;
use crate::store::StoreResult;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

pub struct TicketReaper {
    tickets: TicketStore,
    max_inactive: Duration,
    sweep_interval: Duration,
}

impl TicketReaper {
    #[must_use]
    pub fn new(tickets: TicketStore, config: &AuthConfig) -> Self {
        Self {
            tickets,
            max_inactive: config.max_inactive(),
            sweep_interval: config.sweep_interval(),
        }
    }

    /// Run a single sweep and return how many tickets were removed.
    ///
    /// # Errors
    /// Returns an error if the ticket repository fails.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> StoreResult<u64> {
        self.tickets.delete_older_than(self.max_inactive).await
    }

    /// Spawn the sweep loop. The first sweep runs immediately.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    async fn run(self, shutdown: CancellationToken) {
        let mut ticker = interval(self.sweep_interval.max(MIN_SWEEP_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Ticket reaper started (interval {:?}, max inactive {:?})",
            self.sweep_interval, self.max_inactive
        );

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.run_once().await {
                Ok(removed) => debug!("Sweep removed {removed} ticket(s)"),
                Err(err) => error!("Ticket sweep failed: {err}"),
            }
        }

        info!("Ticket reaper stopped");
    }
}
