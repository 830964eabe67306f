use crate::modules::leaderboard::{error::LeaderboardError, store::SharedRelationshipSource};
use itertools::Itertools;
use std::{collections::HashSet, iter};
use uuid::Uuid;

/// Maps a user to the set of users ranked together with them.
pub struct RelationshipResolver {
    source: SharedRelationshipSource,
}

impl RelationshipResolver {
    pub fn new(source: SharedRelationshipSource) -> Self {
        Self { source }
    }

    /// The user first, then every mutual friend in link order.
    ///
    /// A link without its reverse counterpart is not treated as a peer.
    pub async fn peer_set(&self, user_id: Uuid) -> Result<Vec<Uuid>, LeaderboardError> {
        let (outgoing, incoming) = tokio::try_join!(
            self.source.linked_to(user_id),
            self.source.linked_from(user_id)
        )
        .map_err(|source| LeaderboardError::RelationshipLookup { user_id, source })?;

        let incoming: HashSet<Uuid> = incoming.into_iter().collect();
        let asymmetric = outgoing
            .iter()
            .filter(|peer| **peer != user_id && !incoming.contains(peer))
            .count();
        if asymmetric > 0 {
            tracing::warn!(
                "{} one-way friend link(s) of user {} ignored",
                asymmetric,
                user_id
            );
        }

        let peers = iter::once(user_id)
            .chain(
                outgoing
                    .into_iter()
                    .filter(|peer| *peer != user_id && incoming.contains(peer)),
            )
            .unique()
            .collect();

        Ok(peers)
    }
}
