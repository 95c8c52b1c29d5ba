use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Internal(err) => {
                tracing::error!("API internal error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<parlor_core::CoreError> for ApiError {
    fn from(e: parlor_core::CoreError) -> Self {
        match e {
            parlor_core::CoreError::Unauthorized => ApiError::Unauthorized,
            parlor_core::CoreError::Forbidden => ApiError::Forbidden,
            parlor_core::CoreError::BadRequest(msg) => ApiError::BadRequest(msg),
            parlor_core::CoreError::NotFound => ApiError::NotFound,
            parlor_core::CoreError::Database(_) => {
                ApiError::Internal(anyhow::anyhow!("database error"))
            }
            parlor_core::CoreError::Provider(err) => ApiError::Internal(err),
        }
    }
}

impl From<parlor_db::DbError> for ApiError {
    fn from(e: parlor_db::DbError) -> Self {
        match e {
            parlor_db::DbError::NotFound => ApiError::NotFound,
            parlor_db::DbError::Sqlx(_) => ApiError::Internal(anyhow::anyhow!("database error")),
        }
    }
}
