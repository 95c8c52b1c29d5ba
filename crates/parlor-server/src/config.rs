use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub livekit: LiveKitConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Origins allowed for CORS. Empty means permissive (development).
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LiveKitConfig {
    #[serde(default = "default_livekit_key")]
    pub api_key: String,
    #[serde(default = "default_livekit_secret")]
    pub api_secret: String,
    #[serde(default = "default_livekit_url")]
    pub url: String,
    #[serde(default = "default_livekit_http_url")]
    pub http_url: String,
}

impl Default for LiveKitConfig {
    fn default() -> Self {
        Self {
            api_key: default_livekit_key(),
            api_secret: default_livekit_secret(),
            url: default_livekit_url(),
            http_url: default_livekit_http_url(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".into()
}

fn default_database_url() -> String {
    "sqlite://./data/parlor.db?mode=rwc".into()
}

fn default_max_connections() -> u32 {
    5
}

fn default_livekit_key() -> String {
    "devkey".into()
}

fn default_livekit_secret() -> String {
    "devsecretdevsecretdevsecret".into()
}

fn default_livekit_url() -> String {
    "ws://localhost:7880".into()
}

fn default_livekit_http_url() -> String {
    "http://localhost:7880".into()
}

impl Config {
    /// Load the config file, generating a default one when absent.
    /// Environment variables override the file.
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if std::path::Path::new(path).exists() {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            tracing::info!("Config file not found at '{path}', generating defaults...");
            let config = Config::default();
            if let Some(parent) = std::path::Path::new(path).parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, toml::to_string_pretty(&config)?)?;
            config
        };

        if let Ok(value) = std::env::var("PARLOR_BIND_ADDRESS") {
            config.server.bind_address = value;
        }
        if let Ok(value) = std::env::var("PARLOR_DATABASE_URL") {
            config.database.url = value;
        }
        if let Ok(value) = std::env::var("PARLOR_LIVEKIT_API_KEY") {
            config.livekit.api_key = value;
        }
        if let Ok(value) = std::env::var("PARLOR_LIVEKIT_API_SECRET") {
            config.livekit.api_secret = value;
        }
        if let Ok(value) = std::env::var("PARLOR_LIVEKIT_URL") {
            config.livekit.url = value;
        }
        if let Ok(value) = std::env::var("PARLOR_LIVEKIT_HTTP_URL") {
            config.livekit.http_url = value;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults_and_writes_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parlor.toml");
        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert!(path.exists());

        // the generated template round-trips
        let reloaded = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(reloaded.database.url, config.database.url);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parlor.toml");
        fs::write(
            &path,
            "[server]\nbind_address = \"127.0.0.1:9000\"\n\n[livekit]\napi_key = \"k\"\n",
        )
        .unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:9000");
        assert_eq!(config.livekit.api_key, "k");
        assert_eq!(config.livekit.url, "ws://localhost:7880");
        assert_eq!(config.database.max_connections, 5);
    }
}
