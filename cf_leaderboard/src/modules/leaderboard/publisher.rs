use crate::modules::leaderboard::{
    error::LeaderboardError,
    model::{PublishOutcome, RankingEntry},
    ranking::RankingAssembler,
    relations::RelationshipResolver,
};
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use uuid::Uuid;

/// Real-time delivery of a ranking to the live subscribers of one user.
#[async_trait]
pub trait Channel {
    /// Returns how many subscribers were reached; zero when nobody is listening.
    async fn publish(&self, user_id: Uuid, ranking: &[RankingEntry]) -> Result<usize>;
}

pub type SharedChannel = Arc<dyn Channel + Send + Sync>;

/// Recomputes and pushes the leaderboard view of every affected user.
pub struct FanoutPublisher {
    resolver: Arc<RelationshipResolver>,
    assembler: Arc<RankingAssembler>,
    channel: SharedChannel,
}

impl FanoutPublisher {
    pub fn new(
        resolver: Arc<RelationshipResolver>,
        assembler: Arc<RankingAssembler>,
        channel: SharedChannel,
    ) -> Self {
        Self {
            resolver,
            assembler,
            channel,
        }
    }

    /// Leaderboard view of `user_id` over their own peer set.
    pub async fn ranking_for(&self, user_id: Uuid) -> Result<Vec<RankingEntry>, LeaderboardError> {
        let peers = self.resolver.peer_set(user_id).await?;
        self.assembler.assemble(&peers, user_id).await
    }

    async fn publish_one(&self, user_id: Uuid) -> Result<usize, LeaderboardError> {
        let ranking = self.ranking_for(user_id).await?;
        self.channel
            .publish(user_id, &ranking)
            .await
            .map_err(|source| LeaderboardError::PublishFailure { user_id, source })
    }

    /// Push a fresh ranking to each recipient independently, at most once, without retry.
    ///
    /// A failing recipient is logged and does not affect the others.
    pub async fn publish(&self, affected_user_ids: &[Uuid]) -> Vec<PublishOutcome> {
        let mut tasks: FuturesUnordered<_> = affected_user_ids
            .iter()
            .map(|user_id| async move { (*user_id, self.publish_one(*user_id).await) })
            .collect();

        let mut outcomes = Vec::with_capacity(affected_user_ids.len());
        while let Some((user_id, result)) = tasks.next().await {
            let outcome = match result {
                Ok(delivered) => {
                    tracing::debug!(
                        "leaderboard of user {} pushed to {} subscriber(s)",
                        user_id,
                        delivered
                    );
                    PublishOutcome {
                        user_id,
                        delivered: Some(delivered),
                        error: None,
                    }
                }
                Err(e) => {
                    tracing::error!("failed to publish leaderboard to user {}: {:?}", user_id, e);
                    PublishOutcome {
                        user_id,
                        delivered: None,
                        error: Some(e.describe()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::modules::leaderboard::test_utils::{cache_record, MemoryBackend, RecordingChannel};

    fn publisher(backend: Arc<MemoryBackend>, channel: Arc<RecordingChannel>) -> FanoutPublisher {
        FanoutPublisher::new(
            Arc::new(RelationshipResolver::new(backend.clone())),
            Arc::new(RankingAssembler::new(backend.clone(), backend)),
            channel,
        )
    }

    #[tokio::test]
    async fn test_publish_pushes_once_per_recipient() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let backend = Arc::new(MemoryBackend::new());
        backend.befriend(a, b);
        backend.befriend(a, c);
        for (user_id, rating) in [(a, 1500), (b, 1600), (c, 1700)] {
            backend.insert_record(cache_record(user_id, "handle", rating));
        }
        let channel = Arc::new(RecordingChannel::new());

        let outcomes = publisher(backend, channel.clone()).publish(&[a, b, c]).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|outcome| outcome.error.is_none()));
        assert_eq!(channel.pushes().len(), 3);
        for user_id in [a, b, c] {
            assert_eq!(
                channel
                    .pushes()
                    .iter()
                    .filter(|(recipient, _)| *recipient == user_id)
                    .count(),
                1
            );
        }
    }

    #[tokio::test]
    async fn test_publish_uses_each_recipients_own_peer_set() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let backend = Arc::new(MemoryBackend::new());
        backend.befriend(a, b);
        backend.befriend(a, c);
        for (user_id, rating) in [(a, 1500), (b, 1600), (c, 1700)] {
            backend.insert_record(cache_record(user_id, "handle", rating));
        }
        let channel = Arc::new(RecordingChannel::new());

        publisher(backend, channel.clone()).publish(&[a, b]).await;

        let for_a = channel.pushed_to(a).unwrap();
        assert_eq!(for_a.len(), 3);
        assert!(for_a.iter().any(|entry| entry.user_id == a && entry.is_current_user));

        // b and c are not friends, so c is not on b's leaderboard
        let for_b = channel.pushed_to(b).unwrap();
        let members: Vec<Uuid> = for_b.iter().map(|entry| entry.user_id).collect();
        assert_eq!(members, vec![b, a]);
    }

    #[tokio::test]
    async fn test_publish_failure_is_isolated() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let backend = Arc::new(MemoryBackend::new());
        backend.befriend(a, b);
        backend.befriend(a, c);
        for (user_id, rating) in [(a, 1500), (b, 1600), (c, 1700)] {
            backend.insert_record(cache_record(user_id, "handle", rating));
        }
        backend.fail_relationships_of(c);
        let channel = Arc::new(RecordingChannel::new());

        let outcomes = publisher(backend, channel.clone()).publish(&[a, b, c]).await;

        assert!(channel.pushed_to(a).is_some());
        assert!(channel.pushed_to(b).is_some());
        assert!(channel.pushed_to(c).is_none());
        let failed: Vec<Uuid> = outcomes
            .iter()
            .filter(|outcome| outcome.error.is_some())
            .map(|outcome| outcome.user_id)
            .collect();
        assert_eq!(failed, vec![c]);
    }

    #[tokio::test]
    async fn test_channel_failure_is_isolated() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let backend = Arc::new(MemoryBackend::new());
        backend.befriend(a, b);
        backend.insert_record(cache_record(a, "a", 1500));
        backend.insert_record(cache_record(b, "b", 1500));
        let channel = Arc::new(RecordingChannel::new());
        channel.fail_for(a);

        let outcomes = publisher(backend, channel.clone()).publish(&[a, b]).await;

        assert!(channel.pushed_to(b).is_some());
        let for_a = outcomes.iter().find(|outcome| outcome.user_id == a).unwrap();
        assert_eq!(for_a.delivered, None);
        assert!(for_a
            .error
            .as_deref()
            .unwrap()
            .starts_with("failed to publish ranking to user"));
    }

    #[tokio::test]
    async fn test_ranking_for_requester_without_record() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let backend = Arc::new(MemoryBackend::new());
        backend.befriend(a, b);
        backend.insert_record(cache_record(b, "b", 1500));
        let channel = Arc::new(RecordingChannel::new());

        let ranking = publisher(backend, channel).ranking_for(a).await.unwrap();

        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking[0].user_id, b);
        assert!(!ranking[0].is_current_user);
    }
}
