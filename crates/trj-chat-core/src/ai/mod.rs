pub mod ollama;

pub use ollama::OllamaClient;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::{ChatError, Result};
use crate::state::{ChatMessage, SamplingOptions};

/// Text deltas of one streamed reply, in arrival order.
///
/// The stream is finite and cannot be restarted; a new turn needs a new
/// request. A failure is yielded as an `Err` item and ends the stream.
pub type FragmentStream = BoxStream<'static, std::result::Result<String, ChatError>>;

/// Everything a chat-completion request carries.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub options: SamplingOptions,
}

/// The external model-serving daemon.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Identifiers of the locally installed models, in service order.
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Starts a streaming chat completion.
    async fn chat_stream(&self, request: ChatRequest) -> Result<FragmentStream>;
}
