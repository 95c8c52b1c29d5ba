use crate::user::UserSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Moderation metadata owned by this server and persisted as an opaque blob
/// on the provider's room object. Every moderation transition round-trips the
/// whole structure; the provider has no partial-field update primitive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomMetadata {
    #[serde(default)]
    pub language: String,
    pub owner: Option<UserSummary>,
    #[serde(default)]
    pub co_owners: Vec<UserSummary>,
    #[serde(default)]
    pub welcome_message: String,
    #[serde(default)]
    pub kicked_participants: Vec<KickRecord>,
}

impl RoomMetadata {
    /// Owner and co-owners may moderate the room.
    pub fn is_moderator(&self, user_id: i64) -> bool {
        self.owner.as_ref().is_some_and(|o| o.id == user_id)
            || self.co_owners.iter().any(|co| co.id == user_id)
    }
}

/// A timed or permanent ban of a user from a room.
///
/// `timeout` is in seconds; -1 means permanent. Removed lazily the next time
/// the kicked user attempts to rejoin after the timeout has elapsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KickRecord {
    pub kicked: i64,
    pub kicked_by: i64,
    pub kicked_at: DateTime<Utc>,
    pub timeout: i64,
    #[serde(default)]
    pub reason: String,
}

impl KickRecord {
    pub fn is_permanent(&self) -> bool {
        self.timeout == -1
    }
}

/// A live participant as seen by clients: display identity plus the
/// provider-assigned participant sid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomParticipant {
    #[serde(flatten)]
    pub user: UserSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
}

/// The API view of a room: provider identity and live participants joined
/// with the parsed moderation metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub topic: String,
    pub max_participants: u32,
    #[serde(default)]
    pub participants: Vec<RoomParticipant>,
    #[serde(flatten)]
    pub metadata: RoomMetadata,
}
