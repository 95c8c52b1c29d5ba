use base64::{engine::general_purpose::STANDARD, Engine as _};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// Room-provider credentials and endpoints.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub api_secret: String,
    pub url: String,      // ws://localhost:7880
    pub http_url: String, // http://localhost:7880
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoGrant {
    #[serde(rename = "roomCreate", skip_serializing_if = "Option::is_none")]
    pub room_create: Option<bool>,
    #[serde(rename = "roomList", skip_serializing_if = "Option::is_none")]
    pub room_list: Option<bool>,
    #[serde(rename = "roomAdmin", skip_serializing_if = "Option::is_none")]
    pub room_admin: Option<bool>,
    #[serde(rename = "roomJoin", skip_serializing_if = "Option::is_none")]
    pub room_join: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(rename = "canPublish", skip_serializing_if = "Option::is_none")]
    pub can_publish: Option<bool>,
    #[serde(rename = "canSubscribe", skip_serializing_if = "Option::is_none")]
    pub can_subscribe: Option<bool>,
    #[serde(rename = "canPublishData", skip_serializing_if = "Option::is_none")]
    pub can_publish_data: Option<bool>,
}

impl VideoGrant {
    pub(crate) fn admin() -> Self {
        Self {
            room_create: Some(true),
            room_list: Some(true),
            room_admin: Some(true),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderClaims {
    pub exp: u64,
    pub iss: String,
    pub sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub video: VideoGrant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl ProviderConfig {
    /// Short-lived token for server-to-provider API calls.
    pub(crate) fn generate_admin_token(&self, grant: VideoGrant) -> Result<String, anyhow::Error> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let claims = ProviderClaims {
            exp: now + 300,
            iss: self.api_key.clone(),
            sub: "admin".to_string(),
            name: None,
            video: grant,
            metadata: None,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.api_secret.as_bytes()),
        )?;
        Ok(token)
    }

    /// Verify the bearer token the provider attaches to webhook deliveries:
    /// signed with our api secret, issued under our api key, and carrying a
    /// `sha256` claim binding the token to this delivery's body.
    pub fn verify_webhook_auth(&self, token: &str, body: &str) -> Result<(), anyhow::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        let data = decode::<serde_json::Value>(
            token,
            &DecodingKey::from_secret(self.api_secret.as_bytes()),
            &validation,
        )?;
        match data.claims.get("iss").and_then(|iss| iss.as_str()) {
            Some(iss) if iss == self.api_key => {}
            _ => anyhow::bail!("webhook token issued under a different key"),
        }
        if let Some(expected) = data.claims.get("sha256").and_then(|sum| sum.as_str()) {
            let actual = STANDARD.encode(Sha256::digest(body.as_bytes()));
            if actual != expected {
                anyhow::bail!("webhook body does not match token checksum");
            }
        }
        Ok(())
    }

    /// Token a client presents to join a room. The participant identity is
    /// the user id; the serialized user summary rides in the metadata claim
    /// so webhooks can reconstruct who joined without a lookup.
    pub fn generate_join_token(
        &self,
        room_name: &str,
        user_id: i64,
        user_name: &str,
        user_metadata: &str,
    ) -> Result<String, anyhow::Error> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let claims = ProviderClaims {
            exp: now + 86400,
            iss: self.api_key.clone(),
            sub: user_id.to_string(),
            name: Some(user_name.to_string()),
            video: VideoGrant {
                room_join: Some(true),
                room: Some(room_name.to_string()),
                can_publish: Some(true),
                can_subscribe: Some(true),
                can_publish_data: Some(true),
                ..VideoGrant::default()
            },
            metadata: Some(user_metadata.to_string()),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.api_secret.as_bytes()),
        )?;
        Ok(token)
    }
}
