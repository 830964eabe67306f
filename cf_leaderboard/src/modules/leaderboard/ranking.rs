use crate::modules::leaderboard::{
    error::LeaderboardError,
    model::{Identity, RankingEntry},
    store::{SharedCacheStore, SharedProfileDirectory},
};
use std::collections::HashMap;
use uuid::Uuid;

const UNKNOWN_NAME: &str = "Unknown";

/// Joins cache records with identity records and ranks them.
pub struct RankingAssembler {
    cache: SharedCacheStore,
    profiles: SharedProfileDirectory,
}

impl RankingAssembler {
    pub fn new(cache: SharedCacheStore, profiles: SharedProfileDirectory) -> Self {
        Self { cache, profiles }
    }

    /// Rank every peer that has a cache record, highest `current_rating` first.
    ///
    /// Peers without a record are left out. Equal ratings keep the order the
    /// cache store returned them in.
    pub async fn assemble(
        &self,
        peer_ids: &[Uuid],
        requesting_user_id: Uuid,
    ) -> Result<Vec<RankingEntry>, LeaderboardError> {
        let (records, identities) = tokio::try_join!(
            self.cache.read_many(peer_ids),
            self.profiles.identities(peer_ids)
        )?;

        let identities: HashMap<Uuid, Identity> = identities
            .into_iter()
            .map(|identity| (identity.user_id, identity))
            .collect();

        let mut records = records;
        records.sort_by(|a, b| b.current_rating.cmp(&a.current_rating));

        let ranking = records
            .into_iter()
            .enumerate()
            .map(|(i, record)| {
                let identity = identities.get(&record.user_id);
                if identity.is_none() {
                    tracing::debug!(
                        "{}",
                        LeaderboardError::IdentityLookupMiss(record.user_id)
                    );
                }

                RankingEntry {
                    rank: i + 1,
                    user_id: record.user_id,
                    name: identity
                        .and_then(|identity| identity.name.clone())
                        .unwrap_or(String::from(UNKNOWN_NAME)),
                    email: identity
                        .and_then(|identity| identity.email.clone())
                        .unwrap_or(String::default()),
                    handle: record.handle,
                    current_rating: record.current_rating,
                    max_rating: record.max_rating,
                    rank_title: record.rank_title,
                    total_solved: record.total_solved,
                    contests_count: record.contests_count,
                    last_contest_date: record.last_contest_date,
                    rating_change_week: record.rating_change_week,
                    last_updated: record.last_updated,
                    is_current_user: record.user_id == requesting_user_id,
                }
            })
            .collect();

        Ok(ranking)
    }
}
