use serde::{Deserialize, Serialize};

/// Envelope wrapping every Codeforces API response.
///
/// `result` is present when `status` is `OK`, `comment` when it is `FAILED`.
#[derive(Serialize, Deserialize, Debug)]
pub struct CodeforcesResponse<T> {
    pub status: String,
    pub comment: Option<String>,
    pub result: Option<T>,
}

/// Element of `user.info`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CodeforcesUser {
    pub handle: String,
    pub rating: Option<i32>,
    #[serde(alias = "maxRating")]
    pub max_rating: Option<i32>,
    pub rank: Option<String>,
    #[serde(alias = "maxRank")]
    pub max_rank: Option<String>,
}

/// Element of `user.rating`, one per rated contest participation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RatingChange {
    #[serde(alias = "contestId")]
    pub contest_id: i64,
    #[serde(alias = "contestName", default)]
    pub contest_name: String,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub rank: i32,
    #[serde(alias = "ratingUpdateTimeSeconds")]
    pub rating_update_time_seconds: i64,
    #[serde(alias = "oldRating")]
    pub old_rating: i32,
    #[serde(alias = "newRating")]
    pub new_rating: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SubmissionProblem {
    #[serde(alias = "contestId")]
    pub contest_id: Option<i64>,
    pub index: String,
    #[serde(default)]
    pub name: String,
}

/// Element of `user.status`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: i64,
    #[serde(alias = "contestId")]
    pub contest_id: Option<i64>,
    #[serde(alias = "creationTimeSeconds", default)]
    pub creation_time_seconds: i64,
    pub problem: SubmissionProblem,
    /// Absent while the submission is still being judged.
    pub verdict: Option<String>,
}

impl Submission {
    pub fn is_accepted(&self) -> bool {
        self.verdict.as_deref() == Some("OK")
    }
}
