use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Locally cached summary of one user's Codeforces standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LeaderboardCacheRecord {
    pub user_id: Uuid,
    pub handle: String,
    pub current_rating: i32,
    pub max_rating: i32,
    #[sqlx(rename = "rank")]
    pub rank_title: String,
    pub total_solved: i32,
    pub contests_count: i32,
    pub last_contest_date: Option<DateTime<Utc>>,
    pub rating_change_week: i32,
    pub last_updated: DateTime<Utc>,
}

/// Profile fields owned by the account service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Identity {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    #[sqlx(rename = "codeforces_username")]
    pub handle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub rank: usize,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub handle: String,
    pub current_rating: i32,
    pub max_rating: i32,
    pub rank_title: String,
    pub total_solved: i32,
    pub contests_count: i32,
    pub last_contest_date: Option<DateTime<Utc>>,
    pub rating_change_week: i32,
    pub last_updated: DateTime<Utc>,
    pub is_current_user: bool,
}

/// Progress of one member through a batch refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStage {
    Pending,
    Fetching,
    Building,
    Upserting,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberOutcome {
    pub user_id: Uuid,
    pub handle: Option<String>,
    pub stage: MemberStage,
    /// Stage that was in progress when the member failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<MemberStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MemberOutcome {
    pub fn pending(user_id: Uuid) -> Self {
        Self {
            user_id,
            handle: None,
            stage: MemberStage::Pending,
            failed_at: None,
            error: None,
        }
    }

    pub fn fail(&mut self, message: String) {
        self.failed_at = Some(self.stage);
        self.stage = MemberStage::Failed;
        self.error = Some(message);
    }

    pub fn is_done(&self) -> bool {
        self.stage == MemberStage::Done
    }
}

/// Per-member result of one `refresh_group` batch, in refresh order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshReport {
    pub initiator: Uuid,
    pub succeeded: usize,
    pub failed: usize,
    pub members: Vec<MemberOutcome>,
}

impl RefreshReport {
    pub fn new(initiator: Uuid, members: Vec<MemberOutcome>) -> Self {
        let succeeded = members.iter().filter(|member| member.is_done()).count();
        let failed = members.len() - succeeded;

        Self {
            initiator,
            succeeded,
            failed,
            members,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub user_id: Uuid,
    /// Number of live subscribers reached, absent when publishing failed.
    pub delivered: Option<usize>,
    pub error: Option<String>,
}
