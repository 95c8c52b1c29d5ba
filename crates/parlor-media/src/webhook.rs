use serde::{Deserialize, Serialize};

/// Parsed room-provider webhook event.
///
/// The provider emits `room_started`, `room_finished`, `participant_joined`
/// and `participant_left`; anything else is carried through and ignored
/// upstream. Webhook authentication is verified at the HTTP layer before the
/// body reaches this parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub room: Option<WebhookRoom>,
    pub participant: Option<WebhookParticipant>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookRoom {
    pub name: Option<String>,
    pub sid: Option<String>,
    #[serde(default)]
    pub max_participants: u32,
    /// Opaque metadata blob; this server stores serialized room moderation
    /// metadata in it.
    pub metadata: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookParticipant {
    pub identity: Option<String>,
    pub sid: Option<String>,
    pub metadata: Option<String>,
}

pub fn parse_webhook_event(body: &str) -> Result<WebhookEvent, anyhow::Error> {
    let event: WebhookEvent = serde_json::from_str(body)?;
    Ok(event)
}
