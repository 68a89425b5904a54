use crate::auth::{TicketReaper, TicketStore};
use crate::cli::globals::GlobalArgs;
use crate::store::PgTicketRepository;
use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Run the expiry sweep until Ctrl-C.
/// # Errors
/// Returns an error if the database is unreachable or the signal handler fails.
pub async fn execute(globals: GlobalArgs) -> Result<()> {
    info!("Starting ticket reaper: {globals:?}");

    let pool = globals.connect().await?;
    let tickets = TicketStore::new(Arc::new(PgTicketRepository::new(pool.clone())));
    let shutdown = CancellationToken::new();
    let handle = TicketReaper::new(tickets, &globals.auth).spawn(shutdown.clone());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    shutdown.cancel();
    handle.await?;

    pool.close().await;
    Ok(())
}
