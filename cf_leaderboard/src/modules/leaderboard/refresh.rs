use crate::modules::leaderboard::{
    error::LeaderboardError,
    model::{MemberOutcome, MemberStage, PublishOutcome, RefreshReport},
    publisher::FanoutPublisher,
    record::build_cache_record,
    relations::RelationshipResolver,
    store::{SharedCacheStore, SharedProfileDirectory},
};
use cf_leaderboard_libs::RatingClient;
use chrono::Utc;
use std::sync::Arc;
use tokio::{
    task::JoinHandle,
    time::{self, Duration, Instant},
};
use uuid::Uuid;

/// Minimum spacing between two members' fetches, keeping under the Codeforces rate limit.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(2000);

pub type SharedRatingClient = Arc<dyn RatingClient + Send + Sync>;

pub struct RefreshOutcome {
    pub report: RefreshReport,
    /// Detached fan-out of the refreshed peer set.
    pub fanout: JoinHandle<Vec<PublishOutcome>>,
}

/// Drives the batch refresh of one user's peer set.
pub struct RefreshOrchestrator {
    resolver: Arc<RelationshipResolver>,
    profiles: SharedProfileDirectory,
    client: SharedRatingClient,
    cache: SharedCacheStore,
    publisher: Arc<FanoutPublisher>,
    interval: Duration,
}

impl RefreshOrchestrator {
    pub fn new(
        resolver: Arc<RelationshipResolver>,
        profiles: SharedProfileDirectory,
        client: SharedRatingClient,
        cache: SharedCacheStore,
        publisher: Arc<FanoutPublisher>,
        interval: Duration,
    ) -> Self {
        Self {
            resolver,
            profiles,
            client,
            cache,
            publisher,
            interval,
        }
    }

    async fn refresh_member(
        &self,
        outcome: &mut MemberOutcome,
    ) -> Result<(), LeaderboardError> {
        let user_id = outcome.user_id;

        outcome.stage = MemberStage::Fetching;
        let handle = self
            .profiles
            .handle_of(user_id)
            .await?
            .filter(|handle| !handle.trim().is_empty())
            .ok_or(LeaderboardError::MissingExternalHandle(user_id))?;
        outcome.handle = Some(handle.clone());
        tracing::info!("Fetch Codeforces data of user {} ({})", user_id, handle);

        let (info, history, submissions) = tokio::join!(
            self.client.get_user_info(&handle),
            self.client.get_user_rating(&handle),
            self.client.get_user_submissions(&handle)
        );
        let info = info.map_err(|source| LeaderboardError::ExternalServiceUnavailable {
            handle: handle.clone(),
            source,
        })?;
        let history = history.unwrap_or_else(|e| {
            tracing::warn!("rating history of {} unavailable, treated as empty: {:?}", handle, e);
            Vec::new()
        });
        let submissions = submissions.unwrap_or_else(|e| {
            tracing::warn!("submissions of {} unavailable, treated as empty: {:?}", handle, e);
            Vec::new()
        });

        outcome.stage = MemberStage::Building;
        let record =
            build_cache_record(user_id, &handle, &info, &history, &submissions, Utc::now());

        outcome.stage = MemberStage::Upserting;
        self.cache
            .upsert(&record)
            .await
            .map_err(|source| LeaderboardError::CacheWriteFailure { user_id, source })?;

        outcome.stage = MemberStage::Done;
        Ok(())
    }

    /// Refresh the initiator and every peer one after another, then fan the new rankings out.
    ///
    /// Only a failure to resolve the peer set is returned as an error. Members that
    /// fail are recorded in the report and the batch moves on to the next one.
    pub async fn refresh_group(
        &self,
        initiating_user_id: Uuid,
    ) -> Result<RefreshOutcome, LeaderboardError> {
        let start = Instant::now();
        let peers = self.resolver.peer_set(initiating_user_id).await?;
        tracing::info!(
            "Start to refresh {} member(s) for user {}",
            peers.len(),
            initiating_user_id
        );

        let mut members: Vec<MemberOutcome> = peers
            .iter()
            .map(|user_id| MemberOutcome::pending(*user_id))
            .collect();
        let last = members.len().saturating_sub(1);

        for (i, outcome) in members.iter_mut().enumerate() {
            if let Err(e) = self.refresh_member(outcome).await {
                tracing::error!("failed to refresh user {}: {:?}", outcome.user_id, e);
                outcome.fail(e.describe());
            }

            if i < last {
                time::sleep(self.interval).await;
            }
        }

        let report = RefreshReport::new(initiating_user_id, members);
        tracing::info!(
            target: "refreshlog",
            "elapsed_time={} members={} succeeded={} failed={}",
            start.elapsed().as_millis(),
            report.members.len(),
            report.succeeded,
            report.failed
        );

        let publisher = self.publisher.clone();
        let fanout = tokio::spawn(async move { publisher.publish(&peers).await });

        Ok(RefreshOutcome { report, fanout })
    }
}
