use cf_leaderboard_libs::CodeforcesError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("external handle is not registered for user {0}")]
    MissingExternalHandle(Uuid),
    #[error("external rating service unavailable for handle {handle}")]
    ExternalServiceUnavailable {
        handle: String,
        #[source]
        source: CodeforcesError,
    },
    #[error("failed to write cache record of user {user_id}")]
    CacheWriteFailure {
        user_id: Uuid,
        #[source]
        source: anyhow::Error,
    },
    #[error("identity record not found for user {0}")]
    IdentityLookupMiss(Uuid),
    #[error("failed to publish ranking to user {user_id}")]
    PublishFailure {
        user_id: Uuid,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to resolve peer set of user {user_id}")]
    RelationshipLookup {
        user_id: Uuid,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl LeaderboardError {
    /// Render the error together with its whole cause chain on one line.
    pub fn describe(self) -> String {
        format!("{:#}", anyhow::Error::new(self))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_describe_includes_cause_chain() {
        let error = LeaderboardError::CacheWriteFailure {
            user_id: Uuid::nil(),
            source: anyhow::anyhow!("connection reset"),
        };

        assert_eq!(
            error.describe(),
            "failed to write cache record of user 00000000-0000-0000-0000-000000000000: connection reset"
        );
    }

    #[test]
    fn test_describe_storage_error_is_transparent() {
        let error = LeaderboardError::from(
            anyhow::anyhow!("pool timed out").context("failed to read cache records"),
        );

        assert_eq!(
            error.describe(),
            "failed to read cache records: pool timed out"
        );
    }

    #[test]
    fn test_describe_without_cause() {
        let error = LeaderboardError::MissingExternalHandle(Uuid::nil());

        assert_eq!(
            error.describe(),
            "external handle is not registered for user 00000000-0000-0000-0000-000000000000"
        );
    }
}
