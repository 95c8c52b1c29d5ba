use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use parlor_core::AppState;

use crate::error::ApiError;
use crate::middleware::AuthUser;

pub async fn follow(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if user_id == auth.user.id {
        return Err(ApiError::BadRequest("cannot follow yourself".into()));
    }
    parlor_db::users::get_user_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    parlor_db::users::follow(&state.db, auth.user.id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unfollow(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    parlor_db::users::unfollow(&state.db, auth.user.id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
