use std::sync::Arc;

use anyhow::Result;
use axum::http::HeaderValue;
use clap::Parser;
use parlor_core::{hub::Hub, AppState};
use parlor_media::{ProviderConfig, RoomServiceClient};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("parlor=info,tower_http=debug")),
        )
        .init();

    let args = cli::Args::parse();
    let config = config::Config::load(&args.config)?;

    let db = parlor_db::create_pool(&config.database.url, config.database.max_connections).await?;
    parlor_db::run_migrations(&db).await?;

    let rooms = Arc::new(RoomServiceClient::new(ProviderConfig {
        api_key: config.livekit.api_key.clone(),
        api_secret: config.livekit.api_secret.clone(),
        url: config.livekit.url.clone(),
        http_url: config.livekit.http_url.clone(),
    }));

    let state = AppState {
        db,
        hub: Hub::spawn(),
        rooms,
    };

    let app = parlor_api::build_router()
        .merge(parlor_gateway::gateway_router())
        .with_state(state)
        .layer(build_cors_layer(&config.server.allowed_origins))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!("listening on {}", config.server.bind_address);
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
