use crate::cli::globals::GlobalArgs;
use crate::store::postgres;
use anyhow::{Context, Result};
use tracing::info;

/// # Errors
/// Returns an error if the database is unreachable or a schema statement fails.
pub async fn execute(globals: GlobalArgs) -> Result<()> {
    let pool = globals.connect().await?;
    postgres::apply_schema(&pool)
        .await
        .context("failed to apply schema")?;
    info!("Schema applied to {}", globals.redacted_dsn());

    pool.close().await;
    Ok(())
}
