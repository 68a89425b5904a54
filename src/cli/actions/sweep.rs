use crate::cli::globals::GlobalArgs;
use anyhow::Result;

/// Run one expiry sweep and print how many tickets were removed.
/// # Errors
/// Returns an error if the database is unreachable or the sweep fails.
pub async fn execute(globals: GlobalArgs) -> Result<()> {
    let pool = globals.connect().await?;
    let manager = globals.manager(&pool);

    let removed = manager.sweep_expired(globals.auth.max_inactive()).await?;
    let remaining = manager.tickets().count().await?;
    println!("removed {removed} idle ticket(s), {remaining} remaining");

    pool.close().await;
    Ok(())
}
