//! UI-agnostic session state types
//!
//! This module contains the data retained for one chat session. Both the web
//! handler and the terminal app own exactly one `SessionState` and mutate it
//! only through [`crate::Session`].

use serde::{Deserialize, Serialize};

use crate::catalog::ModelCatalog;
use crate::error::ChatError;
use crate::panel::{TEMPERATURE, TOP_P};

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn display_name(&self) -> &'static str {
        match self {
            ChatRole::User => "You",
            ChatRole::Assistant => "Assistant",
        }
    }
}

/// Chronological, append-only transcript.
///
/// An assistant message is only ever appended directly after a user message.
/// A user message may stay unanswered when a turn is aborted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// True when the newest message is from the user.
    pub fn awaiting_reply(&self) -> bool {
        matches!(self.messages.last(), Some(m) if m.role == ChatRole::User)
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> &ChatMessage {
        self.messages.push(ChatMessage::user(content));
        &self.messages[self.messages.len() - 1]
    }

    /// Returns `None` without appending if there is no user message to answer.
    pub fn push_assistant(&mut self, content: impl Into<String>) -> Option<&ChatMessage> {
        if !self.awaiting_reply() {
            return None;
        }
        self.messages.push(ChatMessage::assistant(content));
        self.messages.last()
    }
}

/// Sampling parameters forwarded to the inference service as `options`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingOptions {
    pub temperature: f64,
    pub top_p: f64,
}

/// What the configuration panel writes and the response streamer reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub selected_model: Option<String>,
    pub temperature: f64,
    pub top_p: f64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            selected_model: None,
            temperature: TEMPERATURE.default,
            top_p: TOP_P.default,
        }
    }
}

impl Configuration {
    pub fn options(&self) -> SamplingOptions {
        SamplingOptions {
            temperature: self.temperature,
            top_p: self.top_p,
        }
    }
}

/// Result of the most recent catalog query.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CatalogStatus {
    #[default]
    Unknown,
    Ready(ModelCatalog),
    Failed(ChatError),
}

impl CatalogStatus {
    pub fn catalog(&self) -> Option<&ModelCatalog> {
        match self {
            CatalogStatus::Ready(catalog) => Some(catalog),
            _ => None,
        }
    }
}

/// Per-turn progress of the response streamer.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    AwaitingResponse,
    Streaming { partial: String },
}

impl TurnState {
    pub fn is_idle(&self) -> bool {
        matches!(self, TurnState::Idle)
    }

    /// Text received so far for the in-flight assistant reply.
    pub fn partial(&self) -> Option<&str> {
        match self {
            TurnState::Idle => None,
            TurnState::AwaitingResponse => Some(""),
            TurnState::Streaming { partial } => Some(partial),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// A user-visible inline message (warning or error).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

/// Everything retained between interactions for one session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub config: Configuration,
    pub conversation: Conversation,
    pub catalog: CatalogStatus,
    pub turn: TurnState,
    pub notice: Option<Notice>,
}
