use crate::token::{ProviderConfig, VideoGrant};
use serde::{Deserialize, Serialize};

/// A room as reported by the provider's RoomService API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderRoom {
    pub sid: String,
    pub name: String,
    #[serde(default)]
    pub max_participants: u32,
    #[serde(default)]
    pub num_participants: u32,
    #[serde(default)]
    pub metadata: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderParticipant {
    pub sid: String,
    pub identity: String,
    #[serde(default)]
    pub metadata: String,
}

/// Thin client for the provider's twirp-style RoomService endpoints.
/// Every call authenticates with a short-lived admin token.
#[derive(Debug, Clone)]
pub struct RoomServiceClient {
    config: ProviderConfig,
    http: reqwest::Client,
}

impl RoomServiceClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn call(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, anyhow::Error> {
        let admin_token = self.config.generate_admin_token(VideoGrant::admin())?;
        let resp = self
            .http
            .post(format!(
                "{}/twirp/livekit.RoomService/{}",
                self.config.http_url, method
            ))
            .header("Authorization", format!("Bearer {}", admin_token))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let err = resp.text().await?;
            anyhow::bail!("RoomService/{} failed: {}", method, err);
        }
        Ok(resp.json().await?)
    }

    pub async fn create_room(
        &self,
        name: &str,
        max_participants: u32,
        metadata: &str,
    ) -> Result<ProviderRoom, anyhow::Error> {
        let body = self
            .call(
                "CreateRoom",
                serde_json::json!({
                    "name": name,
                    "max_participants": max_participants,
                    "empty_timeout": 300,
                    "metadata": metadata,
                }),
            )
            .await?;
        Ok(serde_json::from_value(body)?)
    }

    pub async fn list_rooms(&self) -> Result<Vec<ProviderRoom>, anyhow::Error> {
        let body = self.call("ListRooms", serde_json::json!({})).await?;
        let rooms = body
            .get("rooms")
            .cloned()
            .unwrap_or(serde_json::Value::Array(vec![]));
        Ok(serde_json::from_value(rooms)?)
    }

    /// Look up a single room by name. The provider's ListRooms takes a name
    /// filter; an empty result means the room is not live.
    pub async fn get_room(&self, name: &str) -> Result<Option<ProviderRoom>, anyhow::Error> {
        let body = self
            .call("ListRooms", serde_json::json!({ "names": [name] }))
            .await?;
        let rooms: Vec<ProviderRoom> = match body.get("rooms") {
            Some(rooms) => serde_json::from_value(rooms.clone())?,
            None => vec![],
        };
        Ok(rooms.into_iter().next())
    }

    pub async fn update_room_metadata(
        &self,
        name: &str,
        metadata: &str,
    ) -> Result<(), anyhow::Error> {
        self.call(
            "UpdateRoomMetadata",
            serde_json::json!({ "room": name, "metadata": metadata }),
        )
        .await?;
        Ok(())
    }

    pub async fn list_participants(
        &self,
        name: &str,
    ) -> Result<Vec<ProviderParticipant>, anyhow::Error> {
        let body = self
            .call("ListParticipants", serde_json::json!({ "room": name }))
            .await?;
        let participants = body
            .get("participants")
            .cloned()
            .unwrap_or(serde_json::Value::Array(vec![]));
        Ok(serde_json::from_value(participants)?)
    }

    /// Remove (kick) a participant from a room.
    pub async fn remove_participant(
        &self,
        name: &str,
        identity: &str,
    ) -> Result<(), anyhow::Error> {
        self.call(
            "RemoveParticipant",
            serde_json::json!({ "room": name, "identity": identity }),
        )
        .await?;
        Ok(())
    }
}
