use crate::modules::leaderboard::{
    model::{Identity, LeaderboardCacheRecord},
    store::{CacheStore, ProfileDirectory, RelationshipSource},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{postgres::Postgres, FromRow, Pool};
use uuid::Uuid;

#[derive(Debug, Serialize, FromRow)]
pub struct FriendSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub codeforces_username: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct UserDigest {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub codeforces_username: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum FriendshipChange {
    Created,
    AlreadyExists,
    UnknownUser,
}

/// Escape `%`, `_` and `\` so user input matches literally inside a LIKE pattern.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Postgres-backed profiles, friend links and leaderboard cache.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        PgStore { pool }
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Insert an accepted link in both directions.
    pub async fn add_friendship(&self, user_id: Uuid, friend_id: Uuid) -> Result<FriendshipChange> {
        let exists: bool = sqlx::query_scalar(
            r#"SELECT EXISTS (SELECT 1 FROM "profiles" WHERE "user_id" = $1)"#,
        )
        .bind(friend_id)
        .fetch_one(&self.pool)
        .await?;
        if !exists {
            return Ok(FriendshipChange::UnknownUser);
        }

        let mut tx = self.pool.begin().await.with_context(|| {
            let message = "failed to start transaction";
            tracing::error!(message);
            message
        })?;

        let linked: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM "friends"
                WHERE ("user_id" = $1 AND "friend_id" = $2)
                   OR ("user_id" = $2 AND "friend_id" = $1)
            )
            "#,
        )
        .bind(user_id)
        .bind(friend_id)
        .fetch_one(&mut tx)
        .await?;
        if linked {
            tx.rollback().await?;
            return Ok(FriendshipChange::AlreadyExists);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO "friends" ("user_id", "friend_id", "status")
            VALUES ($1, $2, 'accepted'), ($2, $1, 'accepted')
            "#,
        )
        .bind(user_id)
        .bind(friend_id)
        .execute(&mut tx)
        .await;

        if let Err(e) = result {
            let message = format!(
                "an error occurred at linking {} and {}: {:?}",
                user_id, friend_id, e
            );
            tracing::error!(message);
            tx.rollback().await?;
            anyhow::bail!(message);
        }

        tx.commit().await?;
        tracing::info!("Users {} and {} are now friends.", user_id, friend_id);

        Ok(FriendshipChange::Created)
    }

    /// Delete the link in both directions; returns the number of rows removed.
    pub async fn remove_friendship(&self, user_id: Uuid, friend_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM "friends"
            WHERE ("user_id" = $1 AND "friend_id" = $2)
               OR ("user_id" = $2 AND "friend_id" = $1)
            "#,
        )
        .bind(user_id)
        .bind(friend_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn friends_of(&self, user_id: Uuid) -> Result<Vec<FriendSummary>> {
        let friends = sqlx::query_as(
            r#"
            SELECT
                "friends"."friend_id" AS "id",
                COALESCE("profiles"."name", 'Unknown') AS "name",
                COALESCE("profiles"."email", '') AS "email",
                "profiles"."codeforces_username" AS "codeforces_username",
                "friends"."created_at" AS "created_at"
            FROM
                "friends"
                LEFT JOIN "profiles" ON "profiles"."user_id" = "friends"."friend_id"
            WHERE
                "friends"."user_id" = $1
                AND "friends"."status" = 'accepted'
            ORDER BY
                "friends"."created_at", "friends"."id"
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(friends)
    }

    /// Users whose handle contains `handle` (case-insensitive), excluding `user_id`.
    pub async fn search_by_handle(
        &self,
        user_id: Uuid,
        handle: &str,
        limit: i64,
    ) -> Result<Vec<UserDigest>> {
        let users = sqlx::query_as(
            r#"
            SELECT "user_id", "name", "codeforces_username"
            FROM "profiles"
            WHERE "codeforces_username" ILIKE $1
              AND "user_id" <> $2
            ORDER BY "codeforces_username"
            LIMIT $3
            "#,
        )
        .bind(format!("%{}%", escape_like(handle)))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}

#[async_trait]
impl CacheStore for PgStore {
    async fn upsert(&self, record: &LeaderboardCacheRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO "codeforces_leaderboard_cache" (
                "user_id",
                "handle",
                "current_rating",
                "max_rating",
                "rank",
                "total_solved",
                "contests_count",
                "last_contest_date",
                "rating_change_week",
                "last_updated"
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT ("user_id") DO UPDATE SET (
                "handle",
                "current_rating",
                "max_rating",
                "rank",
                "total_solved",
                "contests_count",
                "last_contest_date",
                "rating_change_week",
                "last_updated"
            ) = (
                EXCLUDED."handle",
                EXCLUDED."current_rating",
                EXCLUDED."max_rating",
                EXCLUDED."rank",
                EXCLUDED."total_solved",
                EXCLUDED."contests_count",
                EXCLUDED."last_contest_date",
                EXCLUDED."rating_change_week",
                EXCLUDED."last_updated"
            )
            "#,
        )
        .bind(record.user_id)
        .bind(&record.handle)
        .bind(record.current_rating)
        .bind(record.max_rating)
        .bind(&record.rank_title)
        .bind(record.total_solved)
        .bind(record.contests_count)
        .bind(record.last_contest_date)
        .bind(record.rating_change_week)
        .bind(record.last_updated)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn read_many(&self, user_ids: &[Uuid]) -> Result<Vec<LeaderboardCacheRecord>> {
        let records = sqlx::query_as(
            r#"
            SELECT
                "user_id",
                "handle",
                "current_rating",
                "max_rating",
                "rank",
                "total_solved",
                "contests_count",
                "last_contest_date",
                "rating_change_week",
                "last_updated"
            FROM
                "codeforces_leaderboard_cache"
            WHERE
                "user_id" = ANY($1)
            ORDER BY
                "current_rating" DESC
            "#,
        )
        .bind(user_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

#[async_trait]
impl ProfileDirectory for PgStore {
    async fn handle_of(&self, user_id: Uuid) -> Result<Option<String>> {
        let handle: Option<Option<String>> = sqlx::query_scalar(
            r#"SELECT "codeforces_username" FROM "profiles" WHERE "user_id" = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(handle.flatten())
    }

    async fn identities(&self, user_ids: &[Uuid]) -> Result<Vec<Identity>> {
        let identities = sqlx::query_as(
            r#"
            SELECT "user_id", "name", "email", "codeforces_username"
            FROM "profiles"
            WHERE "user_id" = ANY($1)
            "#,
        )
        .bind(user_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        Ok(identities)
    }
}

#[async_trait]
impl RelationshipSource for PgStore {
    async fn linked_to(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let peers = sqlx::query_scalar(
            r#"
            SELECT "friend_id" FROM "friends"
            WHERE "user_id" = $1 AND "status" = 'accepted'
            ORDER BY "created_at", "id"
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(peers)
    }

    async fn linked_from(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let peers = sqlx::query_scalar(
            r#"
            SELECT "user_id" FROM "friends"
            WHERE "friend_id" = $1 AND "status" = 'accepted'
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(peers)
    }
}
