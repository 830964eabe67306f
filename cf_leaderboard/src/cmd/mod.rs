pub mod refresh;
pub mod server;

use crate::modules::{
    leaderboard::{
        hub::SubscriberHub,
        publisher::FanoutPublisher,
        ranking::RankingAssembler,
        refresh::{RefreshOrchestrator, SharedRatingClient, DEFAULT_REFRESH_INTERVAL},
        relations::RelationshipResolver,
    },
    migration::MIGRATOR,
    storage::PgStore,
};
use anyhow::{Context, Result};
use cf_leaderboard_libs::CodeforcesClient;
use sqlx::{postgres::Postgres, Pool};
use std::{env, sync::Arc};
use tokio::time::Duration;

/// Default capacity of each user's live update channel.
const SUBSCRIBER_CHANNEL_CAPACITY: usize = 16;

/// Everything the handlers and the refresh command share.
#[derive(Clone)]
pub struct Services {
    pub store: PgStore,
    pub publisher: Arc<FanoutPublisher>,
    pub orchestrator: Arc<RefreshOrchestrator>,
    pub hub: Arc<SubscriberHub>,
}

pub async fn connect_database() -> Result<Pool<Postgres>> {
    let database_url: String = env::var("DATABASE_URL").with_context(|| {
        let message = "DATABASE_URL must be configured.";
        tracing::error!(message);
        message
    })?;

    let pool: Pool<Postgres> = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .with_context(|| {
            let message = "Failed to create database connection pool.";
            tracing::error!(message);
            message
        })?;

    MIGRATOR.run(&pool).await?;

    Ok(pool)
}

pub fn create_rating_client() -> Result<SharedRatingClient> {
    let api_url = env::var("CODEFORCES_API_URL").unwrap_or_else(|_| {
        tracing::info!("CODEFORCES_API_URL is not set. Default value `https://codeforces.com/api/` will be used.");
        String::from("https://codeforces.com/api/")
    });

    let client = CodeforcesClient::new(&api_url).with_context(|| {
        let message = format!("couldn't create Codeforces client for {}", api_url);
        tracing::error!(message);
        message
    })?;

    Ok(Arc::new(client))
}

pub fn refresh_interval() -> Result<Duration> {
    match env::var("REFRESH_INTERVAL_MS") {
        Ok(value) => {
            let millis: u64 = value.parse().with_context(|| {
                let message = format!("REFRESH_INTERVAL_MS must be a number of milliseconds: {}", value);
                tracing::error!(message);
                message
            })?;
            Ok(Duration::from_millis(millis))
        }
        Err(_) => Ok(DEFAULT_REFRESH_INTERVAL),
    }
}

/// Wire the leaderboard engine on top of a single Postgres store.
pub fn build_services(store: PgStore, client: SharedRatingClient, interval: Duration) -> Services {
    let shared = Arc::new(store.clone());
    let hub = Arc::new(SubscriberHub::new(SUBSCRIBER_CHANNEL_CAPACITY));

    let resolver = Arc::new(RelationshipResolver::new(shared.clone()));
    let assembler = Arc::new(RankingAssembler::new(shared.clone(), shared.clone()));
    let publisher = Arc::new(FanoutPublisher::new(
        resolver.clone(),
        assembler,
        hub.clone(),
    ));
    let orchestrator = Arc::new(RefreshOrchestrator::new(
        resolver,
        shared.clone(),
        client,
        shared,
        publisher.clone(),
        interval,
    ));

    Services {
        store,
        publisher,
        orchestrator,
        hub,
    }
}
