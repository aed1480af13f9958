//! One WebSocket per browser session.
//!
//! The connection task owns the session's `Session` value. Inbound events are
//! handled one at a time, so two turns of the same session never overlap.
//! Outbound frames go through an unbounded channel to a writer task, which
//! keeps them in the order they were produced.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::Instrument;
use trj_chat_core::{run_turn, InferenceService, Session};

use crate::protocol::{ClientEvent, ServerFrame};
use crate::server::AppState;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
    let span = tracing::info_span!("session", id = session_id);

    async move {
        tracing::info!("session opened");
        let (mut sink, mut stream) = socket.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();

        let writer = tokio::spawn(
            async move {
                while let Some(frame) = rx.recv().await {
                    let text = match serde_json::to_string(&frame) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!("failed to encode frame: {}", e);
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            }
            .in_current_span(),
        );

        let mut handler = SessionHandler::new(
            Session::from_config(&state.config),
            state.service.clone(),
            tx,
        );
        handler.open().await;

        while let Some(message) = stream.next().await {
            let message = match message {
                Ok(message) => message,
                Err(e) => {
                    tracing::debug!("socket read failed: {}", e);
                    break;
                }
            };

            match message {
                Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => handler.handle(event).await,
                    Err(e) => tracing::warn!("ignoring malformed client event: {}", e),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }

        // Dropping the handler closes the frame channel and stops the writer
        drop(handler);
        let _ = writer.await;
        tracing::info!("session closed");
    }
    .instrument(span)
    .await
}

/// Applies browser events to one session and pushes the resulting frames.
pub struct SessionHandler {
    session: Session,
    service: Arc<dyn InferenceService>,
    frames: UnboundedSender<ServerFrame>,
}

impl SessionHandler {
    pub fn new(
        session: Session,
        service: Arc<dyn InferenceService>,
        frames: UnboundedSender<ServerFrame>,
    ) -> Self {
        Self {
            session,
            service,
            frames,
        }
    }

    /// First render after the socket opens.
    pub async fn open(&mut self) {
        let _ = self.session.refresh_catalog(self.service.as_ref()).await;
        self.send_page();
    }

    pub async fn handle(&mut self, event: ClientEvent) {
        // Every interaction re-queries the catalog; a failure halts this pass
        if self
            .session
            .refresh_catalog(self.service.as_ref())
            .await
            .is_err()
        {
            self.send_page();
            return;
        }

        if let Some(change) = event.config_change() {
            if let Err(e) = self.session.on_config_change(change) {
                tracing::debug!("config change rejected: {}", e);
            }
        } else if let ClientEvent::Submit { text } = event {
            // Redraw the transcript first; the turn then streams on top of it
            self.send_page();
            if let Err(e) = run_turn(&mut self.session, self.service.as_ref(), &text, &self.frames).await {
                tracing::debug!("turn ended with error: {}", e);
            }
        }

        self.send_page();
    }

    fn send_page(&self) {
        let _ = self.frames.send(ServerFrame::Page {
            page: self.session.render(),
        });
    }
}
