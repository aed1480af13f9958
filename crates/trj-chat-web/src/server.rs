//! HTTP routes: the chat page, its WebSocket, and a health check.

use std::sync::Arc;

use axum::{response::Html, routing::get, Router};
use tower_http::trace::TraceLayer;
use trj_chat_core::{Config, InferenceService};

use crate::ws;

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Shared by every session; holds no per-session data.
pub struct AppState {
    pub service: Arc<dyn InferenceService>,
    pub config: Config,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/health", get(health_check))
        .route("/ws", get(ws::upgrade))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_check() -> &'static str {
    "ok"
}
