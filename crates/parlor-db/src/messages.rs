use crate::{bool_from_any_row, datetime_from_db_text, datetime_to_db_text, DbError, DbPool};
use chrono::{DateTime, Utc};
use parlor_models::message::Message;
use sqlx::Row;

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: String,
    pub content: String,
    pub conversation_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub is_edited: bool,
    pub reply_to_id: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::any::AnyRow> for MessageRow {
    fn from_row(row: &'r sqlx::any::AnyRow) -> Result<Self, sqlx::Error> {
        let created_at_raw: String = row.try_get("created_at")?;
        Ok(Self {
            id: row.try_get("id")?,
            content: row.try_get("content")?,
            conversation_id: row.try_get("conversation_id")?,
            user_id: row.try_get("user_id")?,
            created_at: datetime_from_db_text(&created_at_raw)?,
            is_deleted: bool_from_any_row(row, "is_deleted")?,
            is_edited: bool_from_any_row(row, "is_edited")?,
            reply_to_id: row.try_get("reply_to_id")?,
        })
    }
}

impl MessageRow {
    fn into_message(self, reactions: std::collections::HashMap<String, Vec<i64>>) -> Message {
        Message {
            id: self.id,
            content: self.content,
            conversation_id: self.conversation_id,
            user_id: self.user_id,
            created_at: self.created_at,
            is_deleted: self.is_deleted,
            is_edited: self.is_edited,
            reply_to_id: self.reply_to_id,
            reactions,
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_message(
    pool: &DbPool,
    id: &str,
    content: &str,
    conversation_id: i64,
    user_id: i64,
    created_at: DateTime<Utc>,
    reply_to_id: Option<&str>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO messages (id, content, conversation_id, user_id, created_at, reply_to_id)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(id)
    .bind(content)
    .bind(conversation_id)
    .bind(user_id)
    .bind(datetime_to_db_text(created_at))
    .bind(reply_to_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_message(
    pool: &DbPool,
    id: &str,
    content: &str,
    is_deleted: bool,
    is_edited: bool,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE messages SET content = $1, is_deleted = $2, is_edited = $3 WHERE id = $4",
    )
    .bind(content)
    .bind(i64::from(is_deleted))
    .bind(i64::from(is_edited))
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Fetch one message with its reactions resolved.
pub async fn get_message(pool: &DbPool, id: &str) -> Result<Option<Message>, DbError> {
    let row = sqlx::query_as::<_, MessageRow>(
        "SELECT id, content, conversation_id, user_id, created_at, is_deleted, is_edited, reply_to_id
         FROM messages WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let reactions = crate::reactions::for_message(pool, &row.id).await?;
            Ok(Some(row.into_message(reactions)))
        }
        None => Ok(None),
    }
}

/// The most recent `limit` messages of a conversation, oldest first.
pub async fn get_recent_messages(
    pool: &DbPool,
    conversation_id: i64,
    limit: i64,
) -> Result<Vec<Message>, DbError> {
    let mut rows = sqlx::query_as::<_, MessageRow>(
        "SELECT id, content, conversation_id, user_id, created_at, is_deleted, is_edited, reply_to_id
         FROM messages
         WHERE conversation_id = $1
         ORDER BY created_at DESC
         LIMIT $2",
    )
    .bind(conversation_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.reverse();

    let mut messages = Vec::with_capacity(rows.len());
    for row in rows {
        let reactions = crate::reactions::for_message(pool, &row.id).await?;
        messages.push(row.into_message(reactions));
    }
    Ok(messages)
}
