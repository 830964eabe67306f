use crate::modules::leaderboard::{
    model::{Identity, LeaderboardCacheRecord, RankingEntry},
    publisher::Channel,
    store::{CacheStore, ProfileDirectory, RelationshipSource},
};
use anyhow::Result;
use async_trait::async_trait;
use cf_leaderboard_libs::{
    CodeforcesError, CodeforcesUser, RatingChange, RatingClient, Submission, SubmissionProblem,
};
use chrono::{DateTime, Utc};
use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};
use tokio::time::Instant;
use uuid::Uuid;

/// In-memory stand-in for the Postgres-backed collaborators.
#[derive(Default)]
pub struct MemoryBackend {
    links: Mutex<Vec<(Uuid, Uuid)>>,
    profiles: Mutex<Vec<Identity>>,
    records: Mutex<Vec<LeaderboardCacheRecord>>,
    failing_upserts: Mutex<HashSet<Uuid>>,
    failing_relationships: Mutex<Option<HashSet<Uuid>>>,
    fail_all_relationships: Mutex<bool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// One-way accepted link.
    pub fn link(&self, from: Uuid, to: Uuid) {
        self.links.lock().unwrap().push((from, to));
    }

    pub fn befriend(&self, a: Uuid, b: Uuid) {
        self.link(a, b);
        self.link(b, a);
    }

    pub fn add_profile(&self, user_id: Uuid, name: &str, handle: Option<&str>) {
        self.profiles.lock().unwrap().push(Identity {
            user_id,
            name: Some(name.to_string()),
            email: Some(format!("{}@example.com", name)),
            handle: handle.map(String::from),
        });
    }

    pub fn insert_record(&self, record: LeaderboardCacheRecord) {
        self.records.lock().unwrap().push(record);
    }

    pub fn record(&self, user_id: Uuid) -> Option<LeaderboardCacheRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|record| record.user_id == user_id)
            .cloned()
    }

    pub fn fail_upserts_for(&self, user_id: Uuid) {
        self.failing_upserts.lock().unwrap().insert(user_id);
    }

    pub fn fail_relationships(&self) {
        *self.fail_all_relationships.lock().unwrap() = true;
    }

    pub fn fail_relationships_of(&self, user_id: Uuid) {
        self.failing_relationships
            .lock()
            .unwrap()
            .get_or_insert_with(HashSet::new)
            .insert(user_id);
    }

    fn check_relationships(&self, user_id: Uuid) -> Result<()> {
        let fail_one = self
            .failing_relationships
            .lock()
            .unwrap()
            .as_ref()
            .map(|failing| failing.contains(&user_id))
            .unwrap_or(false);
        if *self.fail_all_relationships.lock().unwrap() || fail_one {
            anyhow::bail!("relationship store unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for MemoryBackend {
    async fn upsert(&self, record: &LeaderboardCacheRecord) -> Result<()> {
        if self.failing_upserts.lock().unwrap().contains(&record.user_id) {
            anyhow::bail!("write rejected");
        }

        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|r| r.user_id == record.user_id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    async fn read_many(&self, user_ids: &[Uuid]) -> Result<Vec<LeaderboardCacheRecord>> {
        let mut records: Vec<LeaderboardCacheRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| user_ids.contains(&record.user_id))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.current_rating.cmp(&a.current_rating));
        Ok(records)
    }
}

#[async_trait]
impl ProfileDirectory for MemoryBackend {
    async fn handle_of(&self, user_id: Uuid) -> Result<Option<String>> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|profile| profile.user_id == user_id)
            .and_then(|profile| profile.handle.clone()))
    }

    async fn identities(&self, user_ids: &[Uuid]) -> Result<Vec<Identity>> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .filter(|profile| user_ids.contains(&profile.user_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RelationshipSource for MemoryBackend {
    async fn linked_to(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        self.check_relationships(user_id)?;
        Ok(self
            .links
            .lock()
            .unwrap()
            .iter()
            .filter(|(from, _)| *from == user_id)
            .map(|(_, to)| *to)
            .collect())
    }

    async fn linked_from(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        self.check_relationships(user_id)?;
        Ok(self
            .links
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, to)| *to == user_id)
            .map(|(from, _)| *from)
            .collect())
    }
}

pub struct Profile {
    pub info: CodeforcesUser,
    pub history: Vec<RatingChange>,
    pub submissions: Vec<Submission>,
}

/// Scripted rating service recording every call with the (paused) tokio clock.
#[derive(Default)]
pub struct MockRatingClient {
    profiles: Mutex<HashMap<String, Profile>>,
    unavailable: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, &'static str, Instant)>>,
}

impl MockRatingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, handle: &str, rating: i32) {
        self.add_profile(handle, rating, Vec::new(), Vec::new());
    }

    pub fn add_profile(
        &self,
        handle: &str,
        rating: i32,
        history: Vec<RatingChange>,
        submissions: Vec<Submission>,
    ) {
        let info = CodeforcesUser {
            handle: handle.to_string(),
            rating: Some(rating),
            max_rating: Some(rating),
            rank: Some(String::from("specialist")),
            max_rank: None,
        };
        self.profiles.lock().unwrap().insert(
            handle.to_string(),
            Profile {
                info,
                history,
                submissions,
            },
        );
    }

    pub fn make_unavailable(&self, handle: &str) {
        self.unavailable.lock().unwrap().insert(handle.to_string());
    }

    pub fn calls(&self) -> Vec<(String, &'static str, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    /// Handles in the order their `user.info` call was issued.
    pub fn info_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(_, endpoint, _)| *endpoint == "user.info")
            .map(|(handle, _, _)| handle)
            .collect()
    }

    fn record_call(&self, handle: &str, endpoint: &'static str) -> Result<(), CodeforcesError> {
        self.calls
            .lock()
            .unwrap()
            .push((handle.to_string(), endpoint, Instant::now()));
        if self.unavailable.lock().unwrap().contains(handle) {
            return Err(CodeforcesError::UnexpectedError(String::from(
                "service unavailable",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RatingClient for MockRatingClient {
    async fn get_user_info(&self, handle: &str) -> Result<CodeforcesUser, CodeforcesError> {
        self.record_call(handle, "user.info")?;
        self.profiles
            .lock()
            .unwrap()
            .get(handle)
            .map(|profile| profile.info.clone())
            .ok_or(CodeforcesError::UserNotFound(handle.to_string()))
    }

    async fn get_user_rating(&self, handle: &str) -> Result<Vec<RatingChange>, CodeforcesError> {
        self.record_call(handle, "user.rating")?;
        self.profiles
            .lock()
            .unwrap()
            .get(handle)
            .map(|profile| profile.history.clone())
            .ok_or(CodeforcesError::ApiError(String::from("handle not found")))
    }

    async fn get_user_submissions(
        &self,
        handle: &str,
    ) -> Result<Vec<Submission>, CodeforcesError> {
        self.record_call(handle, "user.status")?;
        self.profiles
            .lock()
            .unwrap()
            .get(handle)
            .map(|profile| profile.submissions.clone())
            .ok_or(CodeforcesError::ApiError(String::from("handle not found")))
    }
}

/// Channel that keeps every push in memory.
#[derive(Default)]
pub struct RecordingChannel {
    pushes: Mutex<Vec<(Uuid, Vec<RankingEntry>)>>,
    failing: Mutex<HashSet<Uuid>>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, user_id: Uuid) {
        self.failing.lock().unwrap().insert(user_id);
    }

    pub fn pushes(&self) -> Vec<(Uuid, Vec<RankingEntry>)> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn pushed_to(&self, user_id: Uuid) -> Option<Vec<RankingEntry>> {
        self.pushes()
            .into_iter()
            .find(|(recipient, _)| *recipient == user_id)
            .map(|(_, ranking)| ranking)
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    async fn publish(&self, user_id: Uuid, ranking: &[RankingEntry]) -> Result<usize> {
        if self.failing.lock().unwrap().contains(&user_id) {
            anyhow::bail!("socket closed");
        }
        self.pushes
            .lock()
            .unwrap()
            .push((user_id, ranking.to_vec()));
        Ok(1)
    }
}

pub fn cache_record(user_id: Uuid, handle: &str, rating: i32) -> LeaderboardCacheRecord {
    LeaderboardCacheRecord {
        user_id,
        handle: handle.to_string(),
        current_rating: rating,
        max_rating: rating,
        rank_title: String::from("specialist"),
        total_solved: 0,
        contests_count: 0,
        last_contest_date: None,
        rating_change_week: 0,
        last_updated: Utc::now(),
    }
}

pub fn accepted(id: i64, contest_id: i64, index: &str) -> Submission {
    Submission {
        id,
        contest_id: Some(contest_id),
        creation_time_seconds: 0,
        problem: SubmissionProblem {
            contest_id: Some(contest_id),
            index: index.to_string(),
            name: String::default(),
        },
        verdict: Some(String::from("OK")),
    }
}

pub fn rating_change(at: DateTime<Utc>, old_rating: i32, new_rating: i32) -> RatingChange {
    RatingChange {
        contest_id: 1,
        contest_name: String::default(),
        handle: String::default(),
        rank: 1,
        rating_update_time_seconds: at.timestamp(),
        old_rating,
        new_rating,
    }
}
