use serde::{Deserialize, Serialize};

/// Display identity carried on sessions, room metadata and broadcast payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub avatar: String,
}
