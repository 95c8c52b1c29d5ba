use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] parlor_db::DbError),
    #[error("room provider error: {0}")]
    Provider(#[from] anyhow::Error),
}
