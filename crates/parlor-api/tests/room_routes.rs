use std::sync::{Arc, Mutex};

use axum::{
    body::{to_bytes, Body},
    extract::{Path, State},
    http::{header, Method, Request, StatusCode},
    routing::post,
    Json, Router,
};
use chrono::{Duration, Utc};
use parlor_core::{hub::Hub, AppState};
use parlor_media::{ProviderConfig, RoomServiceClient};
use parlor_models::room::{KickRecord, RoomMetadata};
use parlor_models::user::UserSummary;
use serde_json::{json, Value};
use tower::ServiceExt;

/// In-process stand-in for the provider's RoomService: serves ListRooms from
/// a mutable metadata blob and records every call it receives.
#[derive(Clone)]
struct ProviderStub {
    metadata: Arc<Mutex<String>>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl ProviderStub {
    fn new() -> Self {
        Self {
            metadata: Arc::new(Mutex::new(String::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn set_metadata(&self, meta: &RoomMetadata) {
        *self.metadata.lock().unwrap() = serde_json::to_string(meta).unwrap();
    }

    fn current_metadata(&self) -> RoomMetadata {
        serde_json::from_str(&self.metadata.lock().unwrap()).unwrap()
    }

    fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

async fn twirp(
    State(stub): State<ProviderStub>,
    Path(method): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    stub.calls
        .lock()
        .unwrap()
        .push((method.clone(), body.clone()));
    match method.as_str() {
        "ListRooms" => {
            let metadata = stub.metadata.lock().unwrap().clone();
            Json(json!({
                "rooms": [{
                    "sid": "RM_1",
                    "name": "rust-talk",
                    "max_participants": 8,
                    "num_participants": 1,
                    "metadata": metadata,
                }]
            }))
        }
        "UpdateRoomMetadata" => {
            let raw = body["metadata"].as_str().unwrap_or_default().to_string();
            *stub.metadata.lock().unwrap() = raw;
            Json(json!({}))
        }
        "ListParticipants" => Json(json!({ "participants": [] })),
        _ => Json(json!({})),
    }
}

struct TestContext {
    app: Router,
    stub: ProviderStub,
    ada: i64,
    bob: i64,
}

impl TestContext {
    /// Ada owns "rust-talk"; Bob is an ordinary participant. Each user's
    /// bearer token is their lowercase name. The room client points at a
    /// local stub RoomService so every provider round-trip is observable.
    async fn new() -> Self {
        let db = parlor_db::create_pool("sqlite::memory:", 1).await.unwrap();
        parlor_db::run_migrations(&db).await.unwrap();

        let mut ids = Vec::new();
        for name in ["ada", "bob"] {
            let id = parlor_db::users::upsert_user(&db, &format!("g-{name}"), name, "")
                .await
                .unwrap();
            parlor_db::users::insert_token(&db, name, id, Utc::now() + Duration::hours(1))
                .await
                .unwrap();
            ids.push(id);
        }

        let stub = ProviderStub::new();
        let provider = Router::new()
            .route("/twirp/livekit.RoomService/{method}", post(twirp))
            .with_state(stub.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, provider).await.unwrap();
        });

        let rooms = Arc::new(RoomServiceClient::new(ProviderConfig {
            api_key: "devkey".to_string(),
            api_secret: "devsecretdevsecretdevsecret".to_string(),
            url: "ws://localhost:7880".to_string(),
            http_url: format!("http://{addr}"),
        }));
        let state = AppState {
            db,
            hub: Hub::spawn(),
            rooms,
        };
        let app = parlor_api::build_router().with_state(state);

        Self {
            app,
            stub,
            ada: ids[0],
            bob: ids[1],
        }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"));
        let request = match body {
            Some(body) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                builder.body(Body::from(body.to_string())).unwrap()
            }
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

fn summary(id: i64, name: &str) -> UserSummary {
    UserSummary {
        id,
        username: name.to_string(),
        avatar: String::new(),
    }
}

fn owned_by(owner: UserSummary) -> RoomMetadata {
    RoomMetadata {
        owner: Some(owner),
        ..RoomMetadata::default()
    }
}

#[tokio::test]
async fn kick_persists_metadata_then_removes_participant() {
    let ctx = TestContext::new().await;
    ctx.stub.set_metadata(&owned_by(summary(ctx.ada, "ada")));

    let (status, body) = ctx
        .request(
            Method::PATCH,
            "/v1/rooms/rust-talk",
            "ada",
            Some(json!({ "action": "kick", "user_id": ctx.bob, "timeout": 60, "reason": "spam" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kicked_participants"][0]["kicked"], ctx.bob);

    let persisted = ctx.stub.current_metadata();
    assert_eq!(persisted.kicked_participants.len(), 1);
    assert_eq!(persisted.kicked_participants[0].kicked, ctx.bob);
    assert_eq!(persisted.kicked_participants[0].kicked_by, ctx.ada);
    assert_eq!(persisted.kicked_participants[0].timeout, 60);

    let calls = ctx.stub.calls();
    let update = calls
        .iter()
        .position(|(method, _)| method == "UpdateRoomMetadata")
        .unwrap();
    let remove = calls
        .iter()
        .position(|(method, _)| method == "RemoveParticipant")
        .unwrap();
    assert!(update < remove, "metadata persists before the drop");
    assert_eq!(calls[remove].1["room"], "rust-talk");
    assert_eq!(calls[remove].1["identity"], ctx.bob.to_string());
}

#[tokio::test]
async fn non_moderator_kick_touches_nothing() {
    let ctx = TestContext::new().await;
    ctx.stub.set_metadata(&owned_by(summary(ctx.ada, "ada")));

    let (status, _) = ctx
        .request(
            Method::PATCH,
            "/v1/rooms/rust-talk",
            "bob",
            Some(json!({ "action": "kick", "user_id": ctx.ada, "timeout": -1 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let calls = ctx.stub.calls();
    assert!(calls
        .iter()
        .all(|(method, _)| method != "UpdateRoomMetadata" && method != "RemoveParticipant"));
    assert!(ctx.stub.current_metadata().kicked_participants.is_empty());
}

#[tokio::test]
async fn expired_kick_record_is_scrubbed_before_minting() {
    let ctx = TestContext::new().await;
    let mut meta = owned_by(summary(ctx.ada, "ada"));
    meta.kicked_participants.push(KickRecord {
        kicked: ctx.bob,
        kicked_by: ctx.ada,
        kicked_at: Utc::now() - Duration::seconds(120),
        timeout: 60,
        reason: String::new(),
    });
    ctx.stub.set_metadata(&meta);

    let (status, body) = ctx
        .request(Method::POST, "/v1/rooms/rust-talk/token", "bob", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["url"], "ws://localhost:7880");

    // the served-out record is gone from the provider before the token lands
    assert!(ctx.stub.current_metadata().kicked_participants.is_empty());
    let calls = ctx.stub.calls();
    let update = calls
        .iter()
        .find(|(method, _)| method == "UpdateRoomMetadata")
        .unwrap();
    let pushed: RoomMetadata = serde_json::from_str(update.1["metadata"].as_str().unwrap()).unwrap();
    assert!(pushed.kicked_participants.is_empty());
}

#[tokio::test]
async fn active_kick_denies_the_token() {
    let ctx = TestContext::new().await;
    let mut meta = owned_by(summary(ctx.ada, "ada"));
    meta.kicked_participants.push(KickRecord {
        kicked: ctx.bob,
        kicked_by: ctx.ada,
        kicked_at: Utc::now(),
        timeout: 600,
        reason: "cooling off".to_string(),
    });
    ctx.stub.set_metadata(&meta);

    let (status, body) = ctx
        .request(Method::POST, "/v1/rooms/rust-talk/token", "bob", None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "kicked");
    assert_eq!(body["record"]["kicked"], ctx.bob);

    // a denial never writes back
    let calls = ctx.stub.calls();
    assert!(calls.iter().all(|(method, _)| method != "UpdateRoomMetadata"));
}
