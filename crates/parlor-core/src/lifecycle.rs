//! Translates room-provider webhook events into broadcasts. Stateless: each
//! webhook becomes at most one everyone-broadcast, unknown events are ignored
//! and nothing is buffered or coalesced.

use crate::hub::{BroadcastRequest, Recipients};
use parlor_media::WebhookEvent;
use parlor_models::event::{PublishEvent, PublishFrame};
use parlor_models::room::{Room, RoomMetadata, RoomParticipant};
use parlor_models::user::UserSummary;
use tracing::warn;

pub fn translate(event: &WebhookEvent) -> Option<BroadcastRequest> {
    let publish = match event.event.as_str() {
        "room_started" => {
            let room = event.room.as_ref()?;
            let metadata = parse_metadata(room.metadata.as_deref());
            PublishEvent::RoomStarted(Room {
                id: room.sid.clone()?,
                topic: room.name.clone().unwrap_or_default(),
                max_participants: room.max_participants,
                participants: Vec::new(),
                metadata,
            })
        }
        "room_finished" => PublishEvent::RoomFinished {
            id: event.room.as_ref()?.sid.clone()?,
        },
        "participant_joined" => {
            let room = event.room.as_ref()?;
            let participant = event.participant.as_ref()?;
            PublishEvent::ParticipantJoined {
                room_id: room.sid.clone()?,
                participant: parse_participant(participant),
            }
        }
        "participant_left" => {
            let room = event.room.as_ref()?;
            let participant = event.participant.as_ref()?;
            PublishEvent::ParticipantLeft {
                room_id: room.sid.clone()?,
                participant_id: participant.identity.clone()?,
            }
        }
        _ => return None,
    };

    Some(BroadcastRequest {
        recipients: Recipients::Everyone,
        frame: PublishFrame::new(publish),
    })
}

fn parse_metadata(raw: Option<&str>) -> RoomMetadata {
    match raw {
        Some(raw) if !raw.is_empty() => serde_json::from_str(raw).unwrap_or_else(|err| {
            warn!(error = %err, "unparseable room metadata in webhook");
            RoomMetadata::default()
        }),
        _ => RoomMetadata::default(),
    }
}

/// The join token embeds the serialized user summary as participant metadata,
/// so webhooks can reconstruct who joined without a database lookup. Fall
/// back to the numeric identity when the metadata is absent or malformed.
fn parse_participant(participant: &parlor_media::WebhookParticipant) -> RoomParticipant {
    let user = participant
        .metadata
        .as_deref()
        .and_then(|raw| serde_json::from_str::<UserSummary>(raw).ok())
        .unwrap_or_else(|| UserSummary {
            id: participant
                .identity
                .as_deref()
                .and_then(|identity| identity.parse().ok())
                .unwrap_or_default(),
            username: String::new(),
            avatar: String::new(),
        });
    RoomParticipant {
        user,
        sid: participant.sid.clone(),
    }
}
