use axum::{
    extract::{Query, State},
    Json,
};
use parlor_core::AppState;
use parlor_models::message::Message;
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::AuthUser;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

#[derive(Deserialize)]
pub struct ListMessagesQuery {
    pub conversation_id: i64,
    pub limit: Option<i64>,
}

/// The most recent messages of a conversation, oldest first. Participants
/// only.
pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListMessagesQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let (low, high) =
        parlor_db::conversations::get_participants(&state.db, query.conversation_id).await?;
    if auth.user.id != low && auth.user.id != high {
        return Err(ApiError::Forbidden);
    }

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let messages =
        parlor_db::messages::get_recent_messages(&state.db, query.conversation_id, limit).await?;
    Ok(Json(messages))
}
