use crate::message::Message;
use crate::room::{Room, RoomParticipant};
use serde::{Deserialize, Serialize};

/// Inbound frame name for DM mutations.
pub const EVENT_CONVERSATION: &str = "ConversationEvent";
/// Outbound frame name for broadcasts.
pub const EVENT_PUBLISH: &str = "PublishEvent";
/// Outbound frame name for per-session error reports.
pub const EVENT_ERROR: &str = "ErrorEvent";

/// A decoded client frame.
///
/// `user_id` is what the client claims; the pipeline rejects it when it does
/// not match the authenticated session identity. `broadcast_to` must be
/// exactly the two participants of the DM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEvent {
    pub name: String,
    pub user_id: i64,
    #[serde(rename = "broadcastTo")]
    pub broadcast_to: Vec<i64>,
    #[serde(flatten)]
    pub action: ConversationAction,
}

/// The closed set of DM mutations, decoded once at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ConversationAction {
    Create(MessageDraft),
    Edit { id: String, content: String },
    Delete { id: String },
    Reaction(ReactionChange),
}

impl ConversationAction {
    /// The id of the message this action targets.
    pub fn message_id(&self) -> &str {
        match self {
            ConversationAction::Create(draft) => &draft.id,
            ConversationAction::Edit { id, .. } => id,
            ConversationAction::Delete { id } => id,
            ConversationAction::Reaction(change) => &change.id,
        }
    }
}

/// Client-supplied fields of a new message. The author and conversation are
/// derived from the authenticated session, never from the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDraft {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub reply_to_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionChange {
    pub id: String,
    pub reaction: String,
    #[serde(rename = "toRemove", default)]
    pub to_remove: bool,
}

/// The closed set of broadcast payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum PublishEvent {
    #[serde(rename = "DM")]
    Dm(Message),
    RoomStarted(Room),
    RoomFinished {
        id: String,
    },
    ParticipantJoined {
        #[serde(rename = "roomID")]
        room_id: String,
        participant: RoomParticipant,
    },
    ParticipantLeft {
        #[serde(rename = "roomID")]
        room_id: String,
        #[serde(rename = "participantID")]
        participant_id: String,
    },
}

impl PublishEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            PublishEvent::Dm(_) => "DM",
            PublishEvent::RoomStarted(_) => "RoomStarted",
            PublishEvent::RoomFinished { .. } => "RoomFinished",
            PublishEvent::ParticipantJoined { .. } => "ParticipantJoined",
            PublishEvent::ParticipantLeft { .. } => "ParticipantLeft",
        }
    }
}

/// Outbound wire frame: `{"data":{"name":"PublishEvent","type":...,"payload":...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishFrame {
    pub data: PublishData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishData {
    pub name: String,
    #[serde(flatten)]
    pub event: PublishEvent,
}

impl PublishFrame {
    pub fn new(event: PublishEvent) -> Self {
        Self {
            data: PublishData {
                name: EVENT_PUBLISH.to_string(),
                event,
            },
        }
    }
}

/// Error frame reported back to the offending session only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorFrame {
    pub data: ErrorData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorData {
    pub name: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl ErrorFrame {
    pub fn new(error: impl Into<String>, message_id: Option<String>) -> Self {
        Self {
            data: ErrorData {
                name: EVENT_ERROR.to_string(),
                error: error.into(),
                message_id,
            },
        }
    }
}
