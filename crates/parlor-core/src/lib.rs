pub mod auth;
pub mod conversation;
pub mod error;
pub mod hub;
pub mod lifecycle;
pub mod moderation;

pub use error::CoreError;

use hub::Hub;
use parlor_db::DbPool;
use parlor_media::RoomServiceClient;
use std::sync::Arc;

/// Shared state handed to every route and session.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub hub: Hub,
    pub rooms: Arc<RoomServiceClient>,
}
