use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use parlor_core::AppState;
use parlor_models::user::UserSummary;

use crate::error::ApiError;

/// Extractor resolving the bearer token to the authenticated user.
pub struct AuthUser {
    pub user: UserSummary,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized)?;

        let user = parlor_core::auth::resolve_session(&state.db, token)
            .await
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(AuthUser { user })
    }
}
