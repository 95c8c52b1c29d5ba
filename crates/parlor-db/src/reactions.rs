use crate::{DbError, DbPool};
use sqlx::Row;
use std::collections::HashMap;

pub async fn insert(
    pool: &DbPool,
    reaction: &str,
    message_id: &str,
    user_id: i64,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO reactions (reaction, message_id, user_id) VALUES ($1, $2, $3)
         ON CONFLICT (reaction, message_id, user_id) DO NOTHING",
    )
    .bind(reaction)
    .bind(message_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete(
    pool: &DbPool,
    reaction: &str,
    message_id: &str,
    user_id: i64,
) -> Result<(), DbError> {
    sqlx::query("DELETE FROM reactions WHERE reaction = $1 AND message_id = $2 AND user_id = $3")
        .bind(reaction)
        .bind(message_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// All reactions on a message, grouped by symbol.
pub async fn for_message(
    pool: &DbPool,
    message_id: &str,
) -> Result<HashMap<String, Vec<i64>>, DbError> {
    let rows = sqlx::query(
        "SELECT reaction, user_id FROM reactions WHERE message_id = $1 ORDER BY reaction, user_id",
    )
    .bind(message_id)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<String, Vec<i64>> = HashMap::new();
    for row in rows {
        let reaction: String = row.try_get("reaction")?;
        let user_id: i64 = row.try_get("user_id")?;
        grouped.entry(reaction).or_default().push(user_id);
    }
    Ok(grouped)
}
