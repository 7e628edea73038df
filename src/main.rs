//! talent-chat - web chat backend for a hosted model-serving endpoint
//!
//! Keeps per-session conversation history in memory, forwards each
//! conversation to the serving endpoint, and formats the structured reply
//! into renderable segments for the chat UI.

mod api;
mod endpoint;
mod format;
mod reply;
mod session;

use api::{create_router, AppState};
use endpoint::{ServingClient, ServingConfig};
use session::SessionManager;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "talent_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let port: u16 = std::env::var("TALENT_CHAT_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8050);

    let serving_config = ServingConfig::from_env();
    let client = ServingClient::new(&serving_config)?;

    if serving_config.token_source().is_some() {
        tracing::info!(
            base_url = serving_config.base_url.as_deref().unwrap_or_default(),
            endpoint = serving_config.endpoint.as_deref().unwrap_or_default(),
            "Serving endpoint configured"
        );
    } else {
        tracing::warn!(
            "No serving token configured. Set SERVING_TOKEN / DATABRICKS_TOKEN or the \
             SERVING_CLIENT_ID / SERVING_CLIENT_SECRET / SERVING_TOKEN_URL trio; otherwise \
             every request must carry an x-forwarded-access-token header."
        );
    }

    // Create application state
    let sessions = SessionManager::new(Arc::new(client));
    let state = AppState::new(sessions);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("talent-chat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
