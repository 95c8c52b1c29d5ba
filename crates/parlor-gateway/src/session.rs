use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use parlor_core::conversation;
use parlor_core::hub::{BroadcastRequest, Recipients, SessionHandle, SESSION_OUTBOUND_CAPACITY};
use parlor_core::AppState;
use parlor_models::event::{
    ConversationEvent, ErrorFrame, PublishEvent, PublishFrame, EVENT_CONVERSATION,
};
use parlor_models::user::UserSummary;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What the read loop does after one inbound frame.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FrameOutcome {
    Continue,
    Close,
}

/// Handle one text frame: decode, run the pipeline, broadcast the result.
///
/// A frame that decodes but is rejected by the pipeline reports an error
/// frame to this session only and leaves the connection up; a frame that
/// does not decode closes it.
pub(crate) async fn handle_frame(
    state: &AppState,
    user: &UserSummary,
    session_id: &str,
    outbound: &mpsc::Sender<String>,
    text: &str,
) -> FrameOutcome {
    let event: ConversationEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(err) => {
            debug!(session_id = %session_id, error = %err, "undecodable frame, closing");
            return FrameOutcome::Close;
        }
    };
    if event.name != EVENT_CONVERSATION {
        return FrameOutcome::Continue;
    }

    match conversation::apply(&state.db, user, &event).await {
        Ok(message) => {
            state.hub.broadcast(BroadcastRequest {
                recipients: Recipients::Users(event.broadcast_to.clone()),
                frame: PublishFrame::new(PublishEvent::Dm(message)),
            });
            FrameOutcome::Continue
        }
        // The event is dropped, the session lives on; only this client
        // hears about the failure.
        Err(err) => {
            warn!(session_id = %session_id, user_id = user.id, error = %err, "event rejected");
            let frame = ErrorFrame::new(err.to_string(), Some(event.action.message_id().to_string()));
            match serde_json::to_string(&frame) {
                Ok(raw) => {
                    if outbound.send(raw).await.is_err() {
                        return FrameOutcome::Close;
                    }
                }
                Err(err) => debug!(error = %err, "failed to serialize error frame"),
            }
            FrameOutcome::Continue
        }
    }
}

/// Drive one authenticated connection: register with the hub, spawn the
/// outbound writer, then run the read loop until the transport drops or the
/// client sends something undecodable.
pub async fn handle_connection(socket: WebSocket, state: AppState, user: UserSummary) {
    let (mut sink, mut stream) = socket.split();
    let (outbound, mut outbound_rx) = mpsc::channel::<String>(SESSION_OUTBOUND_CAPACITY);
    let session_id = uuid::Uuid::new_v4().to_string();

    // The writer owns the sink; everything outbound goes through the bounded
    // channel so a stalled socket backs up here instead of in the hub.
    tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    state.hub.register(SessionHandle {
        id: session_id.clone(),
        user: user.clone(),
        sender: outbound.clone(),
    });
    info!(session_id = %session_id, user_id = user.id, "session connected");

    while let Some(message) = stream.next().await {
        let message = match message {
            Ok(message) => message,
            Err(err) => {
                debug!(session_id = %session_id, error = %err, "transport read error");
                break;
            }
        };
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            // pings are answered by axum; binary and pongs carry nothing here
            _ => continue,
        };

        match handle_frame(&state, &user, &session_id, &outbound, text.as_str()).await {
            FrameOutcome::Continue => {}
            FrameOutcome::Close => break,
        }
    }

    state.hub.unregister(&session_id);
    info!(session_id = %session_id, user_id = user.id, "session disconnected");
    // Dropping `outbound` here lets the writer drain what is queued and exit
    // once the hub has processed the unregister.
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_core::hub::Hub;
    use parlor_media::{ProviderConfig, RoomServiceClient};
    use serde_json::{json, Value};
    use std::sync::Arc;

    /// Ada and Bob are friends; Cam is a stranger to both.
    async fn test_state() -> (AppState, Vec<i64>) {
        let db = parlor_db::create_pool("sqlite::memory:", 1).await.unwrap();
        parlor_db::run_migrations(&db).await.unwrap();

        let mut ids = Vec::new();
        for name in ["ada", "bob", "cam"] {
            let id = parlor_db::users::upsert_user(&db, &format!("g-{name}"), name, "")
                .await
                .unwrap();
            ids.push(id);
        }
        parlor_db::users::follow(&db, ids[0], ids[1]).await.unwrap();
        parlor_db::users::follow(&db, ids[1], ids[0]).await.unwrap();

        let rooms = Arc::new(RoomServiceClient::new(ProviderConfig {
            api_key: "devkey".to_string(),
            api_secret: "devsecretdevsecretdevsecret".to_string(),
            url: "ws://localhost:7880".to_string(),
            http_url: "http://localhost:7880".to_string(),
        }));
        let state = AppState {
            db,
            hub: Hub::spawn(),
            rooms,
        };
        (state, ids)
    }

    fn summary(id: i64, name: &str) -> UserSummary {
        UserSummary {
            id,
            username: name.to_string(),
            avatar: String::new(),
        }
    }

    fn create_frame(actor: i64, peer: i64, message_id: &str) -> String {
        json!({
            "name": EVENT_CONVERSATION,
            "user_id": actor,
            "broadcastTo": [actor, peer],
            "type": "Create",
            "payload": { "id": message_id, "content": "hi" }
        })
        .to_string()
    }

    #[tokio::test]
    async fn rejected_event_reports_error_and_keeps_session() {
        let (state, ids) = test_state().await;
        let ada = summary(ids[0], "ada");
        let (tx, mut rx) = mpsc::channel::<String>(8);

        // ada and cam are not friends: decodes fine, pipeline rejects
        let frame = create_frame(ids[0], ids[2], "m-1");
        let outcome = handle_frame(&state, &ada, "s-1", &tx, &frame).await;
        assert_eq!(outcome, FrameOutcome::Continue);

        let raw = rx.try_recv().unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["data"]["name"], "ErrorEvent");
        assert_eq!(value["data"]["message_id"], "m-1");
    }

    #[tokio::test]
    async fn undecodable_frame_closes_the_session() {
        let (state, ids) = test_state().await;
        let ada = summary(ids[0], "ada");
        let (tx, mut rx) = mpsc::channel::<String>(8);

        let outcome = handle_frame(&state, &ada, "s-1", &tx, "not even json").await;
        assert_eq!(outcome, FrameOutcome::Close);
        assert!(rx.try_recv().is_err());

        // well-formed json that is not a conversation event also closes
        let outcome = handle_frame(&state, &ada, "s-1", &tx, r#"{"name":"Ping"}"#).await;
        assert_eq!(outcome, FrameOutcome::Close);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn accepted_event_broadcasts_to_both_participants() {
        let (state, ids) = test_state().await;
        let ada = summary(ids[0], "ada");
        let (tx, mut self_rx) = mpsc::channel::<String>(8);

        // bob listens through the hub like any other session would
        let (bob_tx, mut bob_rx) = mpsc::channel::<String>(8);
        state.hub.register(SessionHandle {
            id: "bob-session".to_string(),
            user: summary(ids[1], "bob"),
            sender: bob_tx,
        });

        let frame = create_frame(ids[0], ids[1], "m-1");
        let outcome = handle_frame(&state, &ada, "s-1", &tx, &frame).await;
        assert_eq!(outcome, FrameOutcome::Continue);
        assert!(self_rx.try_recv().is_err());

        let raw = tokio::time::timeout(std::time::Duration::from_secs(1), bob_rx.recv())
            .await
            .unwrap()
            .unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["data"]["type"], "DM");
        assert_eq!(value["data"]["payload"]["content"], "hi");
        assert_eq!(value["data"]["payload"]["user_id"], ids[0]);
    }
}
