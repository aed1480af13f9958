//! TRJ Chat web server
//!
//! Serves the single-page chat UI and keeps one session per browser
//! WebSocket. All inference is delegated to the local Ollama server.

mod protocol;
mod server;
mod ws;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use trj_chat_core::{Config, OllamaClient};

use crate::server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Falling back to default config: {:#}", e);
        Config::new().with_env()
    });

    let ollama = OllamaClient::from_config(&config);
    tracing::info!(url = ollama.base_url(), "using Ollama server");

    let state = Arc::new(AppState {
        service: Arc::new(ollama),
        config: config.clone(),
    });
    let app = server::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!("TRJ Chat listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
