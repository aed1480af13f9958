//! Error taxonomy shared by every front-end.
//!
//! Each variant is surfaced to the user as an inline notice; nothing here is
//! fatal to the running process.

use thiserror::Error;

use crate::state::{Notice, NoticeLevel};

pub type Result<T> = std::result::Result<T, ChatError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// The inference service could not be reached or answered with a failure status.
    #[error("Error connecting to Ollama: {0}. Please ensure Ollama is running.")]
    ServiceUnavailable(String),

    /// The service is reachable but has no models installed.
    #[error("No Ollama models found. Please ensure Ollama is running and models are downloaded.")]
    EmptyCatalog,

    /// Input was submitted before a model was chosen.
    #[error("Please select a model from the sidebar to start chatting.")]
    NoModelSelected,

    /// The response stream failed after the request was accepted.
    #[error("The response stream was interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Model '{0}' is not available on this Ollama server.")]
    UnknownModel(String),

    #[error("Please wait for the current response to finish.")]
    TurnInProgress,
}

impl ChatError {
    pub fn level(&self) -> NoticeLevel {
        match self {
            ChatError::ServiceUnavailable(_) | ChatError::StreamInterrupted(_) => NoticeLevel::Error,
            ChatError::EmptyCatalog
            | ChatError::NoModelSelected
            | ChatError::UnknownModel(_)
            | ChatError::TurnInProgress => NoticeLevel::Warning,
        }
    }
}

impl From<&ChatError> for Notice {
    fn from(error: &ChatError) -> Self {
        Notice {
            level: error.level(),
            text: error.to_string(),
        }
    }
}
