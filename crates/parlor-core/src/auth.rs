use crate::error::CoreError;
use parlor_db::{users, DbPool};
use parlor_models::user::UserSummary;

/// Resolve a bearer credential to the session identity every other layer
/// trusts. Unknown or expired tokens are an authorization failure, never a
/// crash.
pub async fn resolve_session(pool: &DbPool, token: &str) -> Result<UserSummary, CoreError> {
    let user = users::get_user_for_token(pool, token)
        .await?
        .ok_or(CoreError::Unauthorized)?;
    Ok(user.summary())
}
