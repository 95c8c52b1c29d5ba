//! The dispatcher: one long-lived task owns the live-session set and drains a
//! command queue in submission order. Everything else talks to it through the
//! cloneable [`Hub`] handle, so registration, removal and fan-out are all
//! serialized through a single point and the session map needs no lock.

use parlor_models::event::PublishFrame;
use parlor_models::user::UserSummary;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Capacity of each session's outbound queue. A session that falls this far
/// behind is evicted rather than allowed to stall the fan-out.
pub const SESSION_OUTBOUND_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum Recipients {
    Everyone,
    Users(Vec<i64>),
}

#[derive(Debug, Clone)]
pub struct BroadcastRequest {
    pub recipients: Recipients,
    pub frame: PublishFrame,
}

/// One registered connection. `sender` feeds the session's writer task; a
/// user with several devices registers one handle per connection.
#[derive(Debug)]
pub struct SessionHandle {
    pub id: String,
    pub user: UserSummary,
    pub sender: mpsc::Sender<String>,
}

enum Command {
    Register(SessionHandle),
    Unregister(String),
    Broadcast(BroadcastRequest),
}

#[derive(Clone)]
pub struct Hub {
    tx: mpsc::UnboundedSender<Command>,
}

impl Hub {
    /// Spawn the dispatcher task and return its handle.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(rx));
        Self { tx }
    }

    pub fn register(&self, session: SessionHandle) {
        let _ = self.tx.send(Command::Register(session));
    }

    /// Idempotent; removing an unknown id is a no-op.
    pub fn unregister(&self, session_id: &str) {
        let _ = self.tx.send(Command::Unregister(session_id.to_string()));
    }

    /// Enqueue a fan-out. Never blocks the caller; requests are resolved in
    /// submission order against the session set as it exists at delivery time.
    pub fn broadcast(&self, request: BroadcastRequest) {
        let _ = self.tx.send(Command::Broadcast(request));
    }
}

struct RegisteredSession {
    user: UserSummary,
    sender: mpsc::Sender<String>,
}

async fn run(mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut sessions: HashMap<String, RegisteredSession> = HashMap::new();

    while let Some(command) = rx.recv().await {
        match command {
            Command::Register(session) => {
                debug!(session_id = %session.id, user_id = session.user.id, "session registered");
                sessions.insert(
                    session.id,
                    RegisteredSession {
                        user: session.user,
                        sender: session.sender,
                    },
                );
            }
            Command::Unregister(session_id) => {
                if sessions.remove(&session_id).is_some() {
                    debug!(session_id = %session_id, "session unregistered");
                }
            }
            Command::Broadcast(request) => {
                let frame = match serde_json::to_string(&request.frame) {
                    Ok(frame) => frame,
                    Err(err) => {
                        error!(error = %err, "failed to serialize broadcast frame");
                        continue;
                    }
                };

                let mut dead = Vec::new();
                for (session_id, session) in &sessions {
                    let targeted = match &request.recipients {
                        Recipients::Everyone => true,
                        Recipients::Users(ids) => ids.contains(&session.user.id),
                    };
                    if !targeted {
                        continue;
                    }
                    // A full or closed queue means the consumer is gone or
                    // hopelessly behind; drop that session, not the fan-out.
                    if session.sender.try_send(frame.clone()).is_err() {
                        dead.push(session_id.clone());
                    }
                }
                for session_id in dead {
                    sessions.remove(&session_id);
                    warn!(session_id = %session_id, "evicted unresponsive session");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_models::event::PublishEvent;
    use std::time::Duration;
    use tokio::time::timeout;

    fn user(id: i64) -> UserSummary {
        UserSummary {
            id,
            username: format!("user-{id}"),
            avatar: String::new(),
        }
    }

    fn attach(hub: &Hub, session_id: &str, user_id: i64) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(SESSION_OUTBOUND_CAPACITY);
        hub.register(SessionHandle {
            id: session_id.to_string(),
            user: user(user_id),
            sender: tx,
        });
        rx
    }

    fn finished_frame(id: &str) -> PublishFrame {
        PublishFrame::new(PublishEvent::RoomFinished { id: id.to_string() })
    }

    async fn recv(rx: &mut mpsc::Receiver<String>) -> String {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for frame")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn everyone_broadcast_reaches_each_session_once() {
        let hub = Hub::spawn();
        let mut a = attach(&hub, "s-a", 1);
        let mut b = attach(&hub, "s-b", 2);

        hub.broadcast(BroadcastRequest {
            recipients: Recipients::Everyone,
            frame: finished_frame("RM_1"),
        });

        let frame_a = recv(&mut a).await;
        let frame_b = recv(&mut b).await;
        assert_eq!(frame_a, frame_b);
        assert!(frame_a.contains("RoomFinished"));
        assert!(timeout(Duration::from_millis(50), a.recv()).await.is_err());
    }

    #[tokio::test]
    async fn explicit_selector_hits_every_device_of_a_user_and_nobody_else() {
        let hub = Hub::spawn();
        let mut phone = attach(&hub, "s-phone", 1);
        let mut laptop = attach(&hub, "s-laptop", 1);
        let mut peer = attach(&hub, "s-peer", 2);
        let mut bystander = attach(&hub, "s-bystander", 3);

        hub.broadcast(BroadcastRequest {
            recipients: Recipients::Users(vec![1, 2]),
            frame: finished_frame("RM_2"),
        });

        recv(&mut phone).await;
        recv(&mut laptop).await;
        recv(&mut peer).await;
        assert!(timeout(Duration::from_millis(50), bystander.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn failed_session_is_evicted_without_disturbing_the_rest() {
        let hub = Hub::spawn();
        let mut alive = attach(&hub, "s-alive", 1);
        let gone = attach(&hub, "s-gone", 2);
        drop(gone);

        hub.broadcast(BroadcastRequest {
            recipients: Recipients::Everyone,
            frame: finished_frame("RM_3"),
        });
        hub.broadcast(BroadcastRequest {
            recipients: Recipients::Everyone,
            frame: finished_frame("RM_4"),
        });

        assert!(recv(&mut alive).await.contains("RM_3"));
        assert!(recv(&mut alive).await.contains("RM_4"));
    }

    #[tokio::test]
    async fn broadcasts_arrive_in_submission_order() {
        let hub = Hub::spawn();
        let mut rx = attach(&hub, "s-1", 1);

        for i in 0..10 {
            hub.broadcast(BroadcastRequest {
                recipients: Recipients::Everyone,
                frame: finished_frame(&format!("RM_{i}")),
            });
        }
        for i in 0..10 {
            assert!(recv(&mut rx).await.contains(&format!("RM_{i}")));
        }
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let hub = Hub::spawn();
        let mut rx = attach(&hub, "s-1", 1);
        hub.unregister("s-unknown");
        hub.unregister("s-unknown");

        hub.broadcast(BroadcastRequest {
            recipients: Recipients::Everyone,
            frame: finished_frame("RM_5"),
        });
        assert!(recv(&mut rx).await.contains("RM_5"));

        hub.unregister("s-1");
        hub.broadcast(BroadcastRequest {
            recipients: Recipients::Everyone,
            frame: finished_frame("RM_6"),
        });
        assert!(timeout(Duration::from_millis(50), rx.recv()).await.is_err());
    }
}
