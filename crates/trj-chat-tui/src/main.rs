//! TRJ Chat terminal front-end
//!
//! Same session model as the web server, drawn with ratatui. Logs go to a
//! daily file under the config directory since stderr is the terminal.

mod app;
mod handler;
mod tui;
mod ui;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use trj_chat_core::{Config, InferenceService, OllamaClient, Session};

use crate::app::App;
use crate::tui::{EventHandler, Tui};

fn init_logging() -> Result<WorkerGuard> {
    let log_dir = Config::config_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::daily(&log_dir, "trj-chat-tui.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_logging()?;

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Falling back to default config: {:#}", e);
        Config::new().with_env()
    });

    let ollama = OllamaClient::from_config(&config);
    tracing::info!(url = ollama.base_url(), "using Ollama server");
    let service: Arc<dyn InferenceService> = Arc::new(ollama);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let mut app = App::new(Session::from_config(&config), service, events.sender());
    if let Err(e) = app.refresh().await {
        tracing::warn!("initial catalog load failed: {}", e);
    }

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }
    Ok(())
}
