mod chat;
mod config;
mod errors;
mod llm_client;
mod models;
mod profile;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails only on malformed values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting portfolio chat v{}", env!("CARGO_PKG_VERSION"));

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;

    let state = AppState::from_config(config).await?;
    info!(
        "LLM client initialized (model: {}, max_tokens: {}, timeout: {:?})",
        llm_client::MODEL,
        llm_client::MAX_TOKENS,
        state.config.upstream_timeout
    );
    if !state.llm.is_configured() {
        warn!("OPENROUTER_API_KEY is not set; /api/chat will answer 503 until it is");
    }
    info!(
        "Profile data: {} (memory: {})",
        state.profiles.path().display(),
        state.config.memory.as_str()
    );

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
