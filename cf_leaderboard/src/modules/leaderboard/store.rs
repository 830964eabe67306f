//! Seams to the collaborators the refresh engine reads from and writes to.

use crate::modules::leaderboard::model::{Identity, LeaderboardCacheRecord};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Keyed store holding one cache record per user.
#[async_trait]
pub trait CacheStore {
    /// Replace every derived field of the record keyed by `record.user_id` at once.
    async fn upsert(&self, record: &LeaderboardCacheRecord) -> Result<()>;
    /// Records of the given users ordered by `current_rating` descending.
    /// Users without a record are omitted.
    async fn read_many(&self, user_ids: &[Uuid]) -> Result<Vec<LeaderboardCacheRecord>>;
}

#[async_trait]
pub trait ProfileDirectory {
    async fn handle_of(&self, user_id: Uuid) -> Result<Option<String>>;
    async fn identities(&self, user_ids: &[Uuid]) -> Result<Vec<Identity>>;
}

/// Accepted friend links as stored, one row per direction.
#[async_trait]
pub trait RelationshipSource {
    /// Users that `user_id` has an accepted link to, oldest link first.
    async fn linked_to(&self, user_id: Uuid) -> Result<Vec<Uuid>>;
    /// Users holding an accepted link to `user_id`.
    async fn linked_from(&self, user_id: Uuid) -> Result<Vec<Uuid>>;
}

pub type SharedCacheStore = Arc<dyn CacheStore + Send + Sync>;
pub type SharedProfileDirectory = Arc<dyn ProfileDirectory + Send + Sync>;
pub type SharedRelationshipSource = Arc<dyn RelationshipSource + Send + Sync>;
