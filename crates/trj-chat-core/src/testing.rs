//! In-memory inference service for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::{stream, StreamExt};

use crate::ai::{ChatRequest, FragmentStream, InferenceService};
use crate::error::{ChatError, Result};

enum Reply {
    Fragments(Vec<Result<String>>),
    Refused(ChatError),
}

pub(crate) struct FakeService {
    models: Result<Vec<String>>,
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl FakeService {
    pub(crate) fn with_models(models: &[&str]) -> Self {
        Self {
            models: Ok(models.iter().map(|m| m.to_string()).collect()),
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn unreachable() -> Self {
        Self {
            models: Err(ChatError::ServiceUnavailable("connection refused".to_string())),
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues a successful streamed reply.
    pub(crate) fn reply(self, fragments: &[&str]) -> Self {
        let items = fragments.iter().map(|f| Ok(f.to_string())).collect();
        self.replies.lock().unwrap().push_back(Reply::Fragments(items));
        self
    }

    /// Queues a reply that fails after the given fragments.
    pub(crate) fn reply_then_fail(self, fragments: &[&str], error: ChatError) -> Self {
        let mut items: Vec<Result<String>> = fragments.iter().map(|f| Ok(f.to_string())).collect();
        items.push(Err(error));
        self.replies.lock().unwrap().push_back(Reply::Fragments(items));
        self
    }

    /// Queues a request that is rejected before streaming starts.
    pub(crate) fn refuse_chat(self, error: ChatError) -> Self {
        self.replies.lock().unwrap().push_back(Reply::Refused(error));
        self
    }

    pub(crate) fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceService for FakeService {
    async fn list_models(&self) -> Result<Vec<String>> {
        self.models.clone()
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<FragmentStream> {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Fragments(Vec::new()));

        match reply {
            Reply::Fragments(items) => Ok(stream::iter(items).boxed()),
            Reply::Refused(error) => Err(error),
        }
    }
}
