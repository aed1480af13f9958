use std::fmt::Display;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatRequest, FragmentStream, InferenceService};
use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::state::{ChatMessage, SamplingOptions};

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    options: SamplingOptions,
    stream: bool,
}

/// One line of the newline-delimited JSON reply.
#[derive(Deserialize)]
struct OllamaChatChunk {
    #[serde(default)]
    message: Option<OllamaChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct OllamaChunkMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct OllamaModelsResponse {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn from_config(config: &Config) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl InferenceService for OllamaClient {
    async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ChatError::ServiceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChatError::ServiceUnavailable(format!(
                "failed to list models: {}",
                response.status()
            )));
        }

        let models_response: OllamaModelsResponse = response
            .json()
            .await
            .map_err(|e| ChatError::ServiceUnavailable(format!("unreadable model list: {}", e)))?;
        let model_names: Vec<String> = models_response
            .models
            .into_iter()
            .map(|model| model.model.unwrap_or(model.name))
            .collect();

        tracing::debug!(count = model_names.len(), "listed ollama models");
        Ok(model_names)
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<FragmentStream> {
        let url = format!("{}/api/chat", self.base_url);

        let body = OllamaChatRequest {
            model: &request.model,
            messages: &request.messages,
            options: request.options,
            stream: true,
        };

        tracing::info!(
            model = %request.model,
            messages = request.messages.len(),
            temperature = request.options.temperature,
            top_p = request.options.top_p,
            "starting chat stream"
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::ServiceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ChatError::ServiceUnavailable(format!(
                "chat request failed with status {}: {}",
                status,
                text.trim()
            )));
        }

        Ok(decode_chat_stream(response.bytes_stream()))
    }
}

/// Turns a byte stream of NDJSON chat chunks into text fragments.
///
/// Lines may be split across reads. The stream ends at the first `done`
/// chunk; an `error` chunk, a transport error, a malformed line or EOF
/// before `done` ends it with `StreamInterrupted`.
pub(crate) fn decode_chat_stream<S, B, E>(inner: S) -> FragmentStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let decoder = ChunkDecoder {
        inner: Box::pin(inner),
        buffer: Vec::new(),
        done: false,
        exhausted: false,
    };

    futures_util::stream::unfold(decoder, |mut decoder| async move {
        decoder.next_fragment().await.map(|item| (item, decoder))
    })
    .boxed()
}

struct ChunkDecoder<S> {
    inner: Pin<Box<S>>,
    buffer: Vec<u8>,
    done: bool,
    exhausted: bool,
}

impl<S, B, E> ChunkDecoder<S>
where
    S: Stream<Item = std::result::Result<B, E>> + Send,
    B: AsRef<[u8]>,
    E: Display,
{
    async fn next_fragment(&mut self) -> Option<Result<String>> {
        loop {
            if self.done {
                return None;
            }

            if let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=pos).collect();
                match self.decode_line(&line) {
                    Some(item) => return Some(item),
                    None => continue,
                }
            }

            if self.exhausted {
                self.done = true;
                return Some(Err(ChatError::StreamInterrupted(
                    "stream ended before the reply was complete".to_string(),
                )));
            }

            match self.inner.next().await {
                Some(Ok(bytes)) => self.buffer.extend_from_slice(bytes.as_ref()),
                Some(Err(e)) => {
                    self.done = true;
                    self.exhausted = true;
                    tracing::warn!("chat stream transport error: {}", e);
                    return Some(Err(ChatError::StreamInterrupted(e.to_string())));
                }
                None => {
                    self.exhausted = true;
                    // Flush a final line that arrived without a newline
                    if self.buffer.iter().any(|b| !b.is_ascii_whitespace()) {
                        self.buffer.push(b'\n');
                    } else {
                        self.buffer.clear();
                    }
                }
            }
        }
    }

    fn decode_line(&mut self, line: &[u8]) -> Option<Result<String>> {
        let text = String::from_utf8_lossy(line);
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let chunk: OllamaChatChunk = match serde_json::from_str(text) {
            Ok(chunk) => chunk,
            Err(e) => {
                self.done = true;
                return Some(Err(ChatError::StreamInterrupted(format!(
                    "malformed chunk from Ollama: {}",
                    e
                ))));
            }
        };

        if let Some(error) = chunk.error {
            self.done = true;
            return Some(Err(ChatError::StreamInterrupted(error)));
        }

        if chunk.done {
            self.done = true;
        }

        let content = chunk.message.map(|m| m.content).unwrap_or_default();
        if content.is_empty() {
            None
        } else {
            Some(Ok(content))
        }
    }
}
