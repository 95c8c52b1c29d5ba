use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A DM message with its reactions resolved.
///
/// `id` is client-generated and immutable once created. `is_deleted` is
/// terminal: the row is retained but no further content edits are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub conversation_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub is_edited: bool,
    pub reply_to_id: Option<String>,
    /// Reaction symbol -> user ids that added it.
    #[serde(default)]
    pub reactions: HashMap<String, Vec<i64>>,
}
