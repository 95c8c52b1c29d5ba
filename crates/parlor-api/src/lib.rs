use axum::{
    routing::{get, post},
    Json, Router,
};
use parlor_core::AppState;
use serde_json::{json, Value};

pub mod error;
pub mod middleware;
pub mod routes;

pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route(
            "/v1/conversations",
            post(routes::conversations::create_conversation),
        )
        .route("/v1/messages", get(routes::messages::list_messages))
        .route(
            "/v1/users/{user_id}/follow",
            post(routes::follows::follow).delete(routes::follows::unfollow),
        )
        .route(
            "/v1/rooms",
            get(routes::rooms::list_rooms).post(routes::rooms::create_room),
        )
        .route("/v1/rooms/webhook", post(routes::rooms::webhook))
        .route(
            "/v1/rooms/{topic}",
            get(routes::rooms::get_room).patch(routes::rooms::update_room),
        )
        .route("/v1/rooms/{topic}/token", post(routes::rooms::issue_token))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
