//! The retained per-session state machine.
//!
//! One `Session` exists per browser connection (or per terminal app). It is
//! mutated only through the event handlers below; front-ends draw from
//! [`Session::render`].

use crate::ai::{ChatRequest, InferenceService};
use crate::catalog::{fetch_catalog, ModelCatalog};
use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::panel::{apply_change, ConfigChange, SelectionPolicy};
use crate::render::{render_page, PageView};
use crate::state::{CatalogStatus, ChatMessage, SessionState, TurnState};

#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
    policy: SelectionPolicy,
    catalog_loaded: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::from_config(&Config::new())
    }
}

impl Session {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self {
            state: SessionState::default(),
            policy,
            catalog_loaded: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(SelectionPolicy::from_config(config))
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn render(&self) -> PageView {
        render_page(&self.state)
    }

    pub fn is_streaming(&self) -> bool {
        !self.state.turn.is_idle()
    }

    /// Re-queries the installed models. Runs on every interaction.
    pub async fn refresh_catalog(&mut self, service: &dyn InferenceService) -> Result<()> {
        match fetch_catalog(service).await {
            Ok(catalog) => {
                self.policy
                    .reconcile(&mut self.state.config, &catalog, !self.catalog_loaded);
                self.catalog_loaded = true;
                self.state.catalog = CatalogStatus::Ready(catalog);
                Ok(())
            }
            Err(error) => {
                self.state.catalog = CatalogStatus::Failed(error.clone());
                Err(error)
            }
        }
    }

    pub fn on_config_change(&mut self, change: ConfigChange) -> Result<()> {
        let catalog = self.ready_catalog()?;
        let result = apply_change(&mut self.state.config, &catalog, change);
        match result {
            Ok(()) => {
                self.state.notice = None;
                Ok(())
            }
            Err(error) => Err(self.fail(error)),
        }
    }

    /// Starts a turn for new user input.
    ///
    /// Blank input is ignored (`Ok(None)`, no state change). Otherwise the
    /// user message is appended, and if a model is selected the request for
    /// the whole history is returned. `NoModelSelected` is returned after the
    /// user message has been appended.
    pub fn submit(&mut self, input: &str) -> Result<Option<ChatRequest>> {
        if !self.state.turn.is_idle() {
            return Err(self.fail(ChatError::TurnInProgress));
        }
        if input.trim().is_empty() {
            return Ok(None);
        }
        self.ready_catalog()?;

        self.state.notice = None;
        self.state.conversation.push_user(input);

        let model = match &self.state.config.selected_model {
            Some(model) => model.clone(),
            None => return Err(self.fail(ChatError::NoModelSelected)),
        };

        self.state.turn = TurnState::AwaitingResponse;
        Ok(Some(ChatRequest {
            model,
            messages: self.state.conversation.messages().to_vec(),
            options: self.state.config.options(),
        }))
    }

    /// Appends a streamed fragment to the in-flight reply.
    pub fn push_fragment(&mut self, fragment: &str) {
        match &mut self.state.turn {
            TurnState::Idle => {
                tracing::warn!("dropping fragment received outside of a turn");
            }
            TurnState::AwaitingResponse => {
                self.state.turn = TurnState::Streaming {
                    partial: fragment.to_string(),
                };
            }
            TurnState::Streaming { partial } => partial.push_str(fragment),
        }
    }

    /// Ends the turn, appending the concatenated reply to history.
    pub fn complete_turn(&mut self) -> Option<ChatMessage> {
        let text = match std::mem::take(&mut self.state.turn) {
            TurnState::Idle => return None,
            TurnState::AwaitingResponse => String::new(),
            TurnState::Streaming { partial } => partial,
        };

        self.state.conversation.push_assistant(text).cloned()
    }

    /// Ends the turn after a failure. The partial reply is dropped and the
    /// user message stays unanswered.
    pub fn interrupt_turn(&mut self, error: ChatError) -> ChatError {
        let dropped = self
            .state
            .turn
            .partial()
            .map(|p| p.len())
            .unwrap_or_default();
        self.state.turn = TurnState::Idle;
        tracing::warn!(dropped_bytes = dropped, "chat turn failed: {}", error);
        self.fail(error)
    }

    pub fn dismiss_notice(&mut self) {
        self.state.notice = None;
    }

    fn ready_catalog(&self) -> Result<ModelCatalog> {
        match &self.state.catalog {
            CatalogStatus::Ready(catalog) => Ok(catalog.clone()),
            CatalogStatus::Failed(error) => Err(error.clone()),
            CatalogStatus::Unknown => Err(ChatError::ServiceUnavailable(
                "the model list has not been loaded yet".to_string(),
            )),
        }
    }

    fn fail(&mut self, error: ChatError) -> ChatError {
        self.state.notice = Some((&error).into());
        error
    }
}
