use crate::{cmd, modules::storage::PgStore};
use anyhow::{Context, Result};
use clap::Args;
use uuid::Uuid;

#[derive(Debug, Args)]
pub struct RefreshArgs {
    /// User whose friend group is refreshed
    user_id: Uuid,
}

pub async fn run(args: RefreshArgs) -> Result<()> {
    let pool = cmd::connect_database().await?;
    let services = cmd::build_services(
        PgStore::new(pool),
        cmd::create_rating_client()?,
        cmd::refresh_interval()?,
    );

    let outcome = services
        .orchestrator
        .refresh_group(args.user_id)
        .await
        .with_context(|| {
            let message = format!("failed to refresh friend group of {}", args.user_id);
            tracing::error!(message);
            message
        })?;

    // Nobody is subscribed from the command line, but the cache views are still recomputed.
    let published = outcome.fanout.await?;
    tracing::info!("Published leaderboard to {} user(s)", published.len());

    println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    Ok(())
}
