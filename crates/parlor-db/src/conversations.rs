use crate::{DbError, DbPool};
use sqlx::Row;

/// Normalize an unordered pair to its (low, high) storage form.
fn normalize_pair(user_a: i64, user_b: i64) -> (i64, i64) {
    if user_a <= user_b {
        (user_a, user_b)
    } else {
        (user_b, user_a)
    }
}

/// Find or create the single conversation for an unordered pair of users.
///
/// Idempotent under concurrency: the unique (user_low, user_high) index plus
/// a conflict-tolerant insert means two racing callers converge on one row.
pub async fn find_or_create(pool: &DbPool, user_a: i64, user_b: i64) -> Result<i64, DbError> {
    let (low, high) = normalize_pair(user_a, user_b);

    if let Some(id) = lookup(pool, low, high).await? {
        return Ok(id);
    }

    sqlx::query(
        "INSERT INTO conversations (user_low, user_high) VALUES ($1, $2)
         ON CONFLICT (user_low, user_high) DO NOTHING",
    )
    .bind(low)
    .bind(high)
    .execute(pool)
    .await?;

    lookup(pool, low, high).await?.ok_or(DbError::NotFound)
}

async fn lookup(pool: &DbPool, low: i64, high: i64) -> Result<Option<i64>, DbError> {
    let row = sqlx::query(
        "SELECT id FROM conversations WHERE user_low = $1 AND user_high = $2",
    )
    .bind(low)
    .bind(high)
    .fetch_optional(pool)
    .await?;
    row.map(|r| r.try_get("id").map_err(DbError::Sqlx)).transpose()
}

/// The participant pair of a conversation. Immutable once created.
pub async fn get_participants(pool: &DbPool, conversation_id: i64) -> Result<(i64, i64), DbError> {
    let row = sqlx::query("SELECT user_low, user_high FROM conversations WHERE id = $1")
        .bind(conversation_id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)?;
    Ok((row.try_get("user_low")?, row.try_get("user_high")?))
}

pub async fn exists(pool: &DbPool, user_a: i64, user_b: i64) -> Result<bool, DbError> {
    let (low, high) = normalize_pair(user_a, user_b);
    Ok(lookup(pool, low, high).await?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> DbPool {
        let pool = crate::create_pool("sqlite::memory:", 1).await.unwrap();
        crate::run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn find_or_create_is_idempotent_and_order_independent() {
        let pool = test_pool().await;
        let first = find_or_create(&pool, 7, 12).await.unwrap();
        let second = find_or_create(&pool, 12, 7).await.unwrap();
        let third = find_or_create(&pool, 7, 12).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, third);

        let other = find_or_create(&pool, 7, 13).await.unwrap();
        assert_ne!(first, other);
    }

    #[tokio::test]
    async fn participants_are_stored_normalized() {
        let pool = test_pool().await;
        let id = find_or_create(&pool, 12, 7).await.unwrap();
        assert_eq!(get_participants(&pool, id).await.unwrap(), (7, 12));
    }

    #[tokio::test]
    async fn concurrent_creation_converges_on_one_id() {
        let pool = test_pool().await;
        let (a, b) = tokio::join!(find_or_create(&pool, 3, 4), find_or_create(&pool, 4, 3));
        assert_eq!(a.unwrap(), b.unwrap());
    }
}
