use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use parlor_core::{lifecycle, moderation, AppState};
use parlor_media::{ProviderParticipant, ProviderRoom};
use parlor_models::room::{KickRecord, Room, RoomMetadata, RoomParticipant};
use parlor_models::user::UserSummary;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::middleware::AuthUser;

const DEFAULT_MAX_PARTICIPANTS: u32 = 8;

fn parse_metadata(raw: &str) -> RoomMetadata {
    if raw.is_empty() {
        return RoomMetadata::default();
    }
    serde_json::from_str(raw).unwrap_or_else(|err| {
        warn!(error = %err, "unparseable room metadata from provider");
        RoomMetadata::default()
    })
}

fn encode_metadata(meta: &RoomMetadata) -> Result<String, ApiError> {
    serde_json::to_string(meta).map_err(|err| ApiError::Internal(anyhow::anyhow!(err)))
}

/// The join token carries the serialized user summary as participant
/// metadata; reverse that here for the API view.
fn participant_view(participant: &ProviderParticipant) -> RoomParticipant {
    let user = serde_json::from_str::<UserSummary>(&participant.metadata).unwrap_or_else(|_| {
        UserSummary {
            id: participant.identity.parse().unwrap_or_default(),
            username: String::new(),
            avatar: String::new(),
        }
    });
    RoomParticipant {
        user,
        sid: Some(participant.sid.clone()),
    }
}

fn assemble_room(room: &ProviderRoom, participants: Vec<RoomParticipant>) -> Room {
    Room {
        id: room.sid.clone(),
        topic: room.name.clone(),
        max_participants: room.max_participants,
        participants,
        metadata: parse_metadata(&room.metadata),
    }
}

pub async fn list_rooms(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<Room>>, ApiError> {
    let provider_rooms = state.rooms.list_rooms().await?;
    let mut rooms = Vec::with_capacity(provider_rooms.len());
    for room in &provider_rooms {
        let participants = state
            .rooms
            .list_participants(&room.name)
            .await?
            .iter()
            .map(participant_view)
            .collect();
        rooms.push(assemble_room(room, participants));
    }
    Ok(Json(rooms))
}

pub async fn get_room(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(topic): Path<String>,
) -> Result<Json<Room>, ApiError> {
    let room = state
        .rooms
        .get_room(&topic)
        .await?
        .ok_or(ApiError::NotFound)?;
    let participants = state
        .rooms
        .list_participants(&topic)
        .await?
        .iter()
        .map(participant_view)
        .collect();
    Ok(Json(assemble_room(&room, participants)))
}

#[derive(Deserialize)]
pub struct CreateRoomRequest {
    pub topic: String,
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub welcome_message: String,
}

pub async fn create_room(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<Room>), ApiError> {
    if body.topic.is_empty() {
        return Err(ApiError::BadRequest("topic must not be empty".into()));
    }

    let meta = RoomMetadata {
        language: body.language,
        owner: Some(auth.user.clone()),
        co_owners: Vec::new(),
        welcome_message: body.welcome_message,
        kicked_participants: Vec::new(),
    };
    let room = state
        .rooms
        .create_room(
            &body.topic,
            body.max_participants.unwrap_or(DEFAULT_MAX_PARTICIPANTS),
            &encode_metadata(&meta)?,
        )
        .await?;
    info!(topic = %body.topic, owner_id = auth.user.id, "room created");
    Ok((StatusCode::CREATED, Json(assemble_room(&room, Vec::new()))))
}

#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ModerationRequest {
    Kick {
        user_id: i64,
        /// Seconds until the kicked user may rejoin; -1 is permanent.
        timeout: i64,
        #[serde(default)]
        reason: String,
    },
    CoOwner {
        user: UserSummary,
    },
    WelcomeMessage {
        text: String,
    },
}

/// Apply one moderation transition and persist the whole metadata blob back
/// through the provider.
pub async fn update_room(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(topic): Path<String>,
    Json(body): Json<ModerationRequest>,
) -> Result<Json<RoomMetadata>, ApiError> {
    let room = state
        .rooms
        .get_room(&topic)
        .await?
        .ok_or(ApiError::NotFound)?;
    let mut meta = parse_metadata(&room.metadata);

    let mut remove_identity = None;
    match body {
        ModerationRequest::Kick {
            user_id,
            timeout,
            reason,
        } => {
            let record = KickRecord {
                kicked: user_id,
                kicked_by: auth.user.id,
                kicked_at: Utc::now(),
                timeout,
                reason,
            };
            if moderation::kick(&mut meta, auth.user.id, record)? == moderation::KickOutcome::Recorded
            {
                remove_identity = Some(user_id.to_string());
            }
        }
        ModerationRequest::CoOwner { user } => {
            moderation::toggle_co_owner(&mut meta, auth.user.id, user)?;
        }
        ModerationRequest::WelcomeMessage { text } => {
            moderation::set_welcome_message(&mut meta, auth.user.id, &text)?;
        }
    }

    state
        .rooms
        .update_room_metadata(&topic, &encode_metadata(&meta)?)
        .await?;
    if let Some(identity) = remove_identity {
        state.rooms.remove_participant(&topic, &identity).await?;
        info!(topic = %topic, kicked = %identity, kicked_by = auth.user.id, "participant kicked");
    }
    Ok(Json(meta))
}

/// Evaluate the rejoin gate and mint a join token. A denial carries the
/// active kick record; a grant past an expired kick removes the record
/// before issuing the token.
pub async fn issue_token(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(topic): Path<String>,
) -> Result<Response, ApiError> {
    let room = state
        .rooms
        .get_room(&topic)
        .await?
        .ok_or(ApiError::NotFound)?;
    let mut meta = parse_metadata(&room.metadata);

    match moderation::evaluate_rejoin(&mut meta, auth.user.id, Utc::now()) {
        moderation::RejoinDecision::Denied { record } => {
            return Ok((
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "kicked", "record": record })),
            )
                .into_response());
        }
        moderation::RejoinDecision::Granted { record_removed } => {
            if record_removed {
                state
                    .rooms
                    .update_room_metadata(&topic, &encode_metadata(&meta)?)
                    .await?;
            }
        }
    }

    let user_metadata = serde_json::to_string(&auth.user)
        .map_err(|err| ApiError::Internal(anyhow::anyhow!(err)))?;
    let token = state.rooms.config().generate_join_token(
        &topic,
        auth.user.id,
        &auth.user.username,
        &user_metadata,
    )?;
    Ok(Json(json!({
        "token": token,
        "url": state.rooms.config().url,
        "welcome_message": meta.welcome_message,
    }))
    .into_response())
}

/// Provider webhook sink: verify, translate, submit to the hub, acknowledge.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v))
        .ok_or(ApiError::Unauthorized)?;
    state
        .rooms
        .config()
        .verify_webhook_auth(token, &body)
        .map_err(|_| ApiError::Unauthorized)?;

    let event = parlor_media::parse_webhook_event(&body)
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;
    if let Some(request) = lifecycle::translate(&event) {
        state.hub.broadcast(request);
    }
    Ok(Json(json!({ "ok": true })))
}
