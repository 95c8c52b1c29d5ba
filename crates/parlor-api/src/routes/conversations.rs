use axum::{extract::State, http::StatusCode, Json};
use parlor_core::AppState;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;

#[derive(Deserialize)]
pub struct CreateConversationRequest {
    pub participants: Vec<i64>,
}

/// Open (or return the existing) DM conversation between the authenticated
/// user and one friend.
pub async fn create_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if body.participants.len() != 2 || !body.participants.contains(&auth.user.id) {
        return Err(ApiError::BadRequest(
            "participants must be the authenticated user and one peer".into(),
        ));
    }
    let peer = body
        .participants
        .iter()
        .copied()
        .find(|&id| id != auth.user.id)
        .ok_or_else(|| ApiError::BadRequest("cannot open a conversation with yourself".into()))?;

    if !parlor_db::users::are_friends(&state.db, auth.user.id, peer).await? {
        return Err(ApiError::Forbidden);
    }

    let id = parlor_db::conversations::find_or_create(&state.db, auth.user.id, peer).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id, "participants": body.participants })),
    ))
}
