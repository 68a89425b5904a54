use crate::cli::globals::GlobalArgs;
use anyhow::Result;
use secrecy::SecretString;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub tenant: String,
    pub username: String,
    pub password: SecretString,
}

/// Authenticate and print the ticket on stdout.
/// # Errors
/// Returns an error on bad credentials, a disabled user, or a store failure.
pub async fn execute(args: Args) -> Result<()> {
    let pool = args.globals.connect().await?;
    let manager = args.globals.manager(&pool);

    let authentication = manager
        .authenticate_user(&args.tenant, &args.username, &args.password)
        .await?;
    debug!(
        "Profile '{}' authenticated in tenant '{}'",
        authentication.profile().id,
        args.tenant
    );
    println!("{}", authentication.ticket());

    pool.close().await;
    Ok(())
}
