use crate::modules::leaderboard::model::LeaderboardCacheRecord;
use cf_leaderboard_libs::{CodeforcesUser, RatingChange, Submission};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashSet;
use uuid::Uuid;

/// Length of the trailing window used for `rating_change_week`.
pub const RATING_CHANGE_WINDOW_SECONDS: i64 = 7 * 24 * 60 * 60;

const UNRATED: &str = "unrated";

/// Count of distinct `(contest_id, index)` pairs with at least one accepted submission.
pub fn count_solved(submissions: &[Submission]) -> usize {
    submissions
        .iter()
        .filter(|submission| submission.is_accepted())
        .map(|submission| (submission.problem.contest_id, submission.problem.index.as_str()))
        .collect::<HashSet<_>>()
        .len()
}

pub fn last_contest_date(history: &[RatingChange]) -> Option<DateTime<Utc>> {
    history
        .iter()
        .map(|change| change.rating_update_time_seconds)
        .max()
        .and_then(|seconds| Utc.timestamp_opt(seconds, 0).single())
}

/// Net rating movement over the trailing week.
///
/// Measured against the rating held before the earliest contest in the window,
/// so several contests in one week are not summed individually.
pub fn rating_change_week(current_rating: i32, history: &[RatingChange], now: DateTime<Utc>) -> i32 {
    let window_start = now.timestamp() - RATING_CHANGE_WINDOW_SECONDS;

    history
        .iter()
        .filter(|change| change.rating_update_time_seconds >= window_start)
        .min_by_key(|change| change.rating_update_time_seconds)
        .map(|earliest| current_rating - earliest.old_rating)
        .unwrap_or(0)
}

/// Derive the cache record for one user from the raw Codeforces payload.
pub fn build_cache_record(
    user_id: Uuid,
    handle: &str,
    info: &CodeforcesUser,
    history: &[RatingChange],
    submissions: &[Submission],
    now: DateTime<Utc>,
) -> LeaderboardCacheRecord {
    let current_rating = info.rating.unwrap_or(0);

    LeaderboardCacheRecord {
        user_id,
        handle: handle.to_string(),
        current_rating,
        max_rating: info.max_rating.unwrap_or(0),
        rank_title: info.rank.clone().unwrap_or(String::from(UNRATED)),
        total_solved: count_solved(submissions) as i32,
        contests_count: history.len() as i32,
        last_contest_date: last_contest_date(history),
        rating_change_week: rating_change_week(current_rating, history, now),
        last_updated: now,
    }
}
