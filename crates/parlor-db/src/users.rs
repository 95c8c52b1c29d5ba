use crate::{DbError, DbPool};
use chrono::{DateTime, Utc};
use parlor_models::user::UserSummary;
use sha2::{Digest, Sha256};
use sqlx::Row;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub gid: String,
    pub username: String,
    pub avatar: String,
    pub bio: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::any::AnyRow> for UserRow {
    fn from_row(row: &'r sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            gid: row.try_get("gid")?,
            username: row.try_get("username")?,
            avatar: row.try_get("avatar")?,
            bio: row.try_get("bio")?,
        })
    }
}

impl UserRow {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// Insert or refresh a user keyed by its external identity (`gid`).
pub async fn upsert_user(
    pool: &DbPool,
    gid: &str,
    username: &str,
    avatar: &str,
) -> Result<i64, DbError> {
    let row = sqlx::query(
        "INSERT INTO users (gid, username, avatar)
         VALUES ($1, $2, $3)
         ON CONFLICT (gid) DO UPDATE SET username = excluded.username, avatar = excluded.avatar
         RETURNING id",
    )
    .bind(gid)
    .bind(username)
    .bind(avatar)
    .fetch_one(pool)
    .await?;
    Ok(row.try_get("id").map_err(DbError::Sqlx)?)
}

pub async fn get_user_by_id(pool: &DbPool, user_id: i64) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, gid, username, avatar, bio FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Resolve a bearer credential to its user. Fails when the token is unknown
/// or past its expiry; the caller maps that to an authorization failure.
pub async fn get_user_for_token(pool: &DbPool, token: &str) -> Result<Option<UserRow>, DbError> {
    let hash = hash_token(token);
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT u.id, u.gid, u.username, u.avatar, u.bio
         FROM users u
         INNER JOIN tokens t ON t.user_id = u.id
         WHERE t.hash = $1 AND t.scope = 'authentication' AND t.expires_at >= $2",
    )
    .bind(hash)
    .bind(crate::datetime_to_db_text(Utc::now()))
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Store a session token for a user. Token issuance itself lives outside this
/// core; this is the persistence half consumed by it (and by tests).
pub async fn insert_token(
    pool: &DbPool,
    token: &str,
    user_id: i64,
    expires_at: DateTime<Utc>,
) -> Result<(), DbError> {
    sqlx::query("INSERT INTO tokens (hash, user_id, expires_at) VALUES ($1, $2, $3)")
        .bind(hash_token(token))
        .bind(user_id)
        .bind(crate::datetime_to_db_text(expires_at))
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn follow(pool: &DbPool, follower_id: i64, following_id: i64) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO follows (follower_id, following_id) VALUES ($1, $2)
         ON CONFLICT (follower_id, following_id) DO NOTHING",
    )
    .bind(follower_id)
    .bind(following_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn unfollow(pool: &DbPool, follower_id: i64, following_id: i64) -> Result<(), DbError> {
    sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
        .bind(follower_id)
        .bind(following_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Two users are friends when they follow each other.
pub async fn are_friends(pool: &DbPool, user_a: i64, user_b: i64) -> Result<bool, DbError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM follows
         WHERE (follower_id = $1 AND following_id = $2)
            OR (follower_id = $2 AND following_id = $1)",
    )
    .bind(user_a)
    .bind(user_b)
    .fetch_one(pool)
    .await?;
    Ok(count == 2)
}
