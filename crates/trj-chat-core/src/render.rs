//! Pure projections of session state into what a front-end draws.
//!
//! Nothing here mutates state; rendering the same state twice yields equal
//! views.

use serde::Serialize;

use crate::markdown::{parse_blocks, MarkdownBlock};
use crate::panel::{SliderSpec, TEMPERATURE, TOP_P};
use crate::state::{CatalogStatus, ChatRole, Conversation, Notice, SessionState};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedMessage {
    pub role: ChatRole,
    pub label: &'static str,
    pub content: String,
    /// `content` parsed for display
    pub blocks: Vec<MarkdownBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliderView {
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub value: f64,
    pub help: &'static str,
}

impl SliderView {
    fn new(spec: &SliderSpec, value: f64) -> Self {
        Self {
            label: spec.label,
            min: spec.min,
            max: spec.max,
            step: spec.step,
            value,
            help: spec.help,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SidebarView {
    pub models: Vec<String>,
    pub selected_model: Option<String>,
    pub temperature: SliderView,
    pub top_p: SliderView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PageView {
    /// No catalog query has completed yet.
    Loading,
    /// The catalog query failed; only the notice is shown.
    Halted { notice: Notice },
    Ready {
        sidebar: SidebarView,
        transcript: Vec<RenderedMessage>,
        /// Assistant text received so far while a reply streams
        pending: Option<String>,
        notice: Option<Notice>,
    },
}

impl PageView {
    pub fn is_halted(&self) -> bool {
        matches!(self, PageView::Halted { .. })
    }
}

pub fn render_transcript(conversation: &Conversation) -> Vec<RenderedMessage> {
    conversation
        .messages()
        .iter()
        .map(|message| RenderedMessage {
            role: message.role,
            label: message.role.display_name(),
            content: message.content.clone(),
            blocks: parse_blocks(&message.content),
        })
        .collect()
}

pub fn render_page(state: &SessionState) -> PageView {
    let catalog = match &state.catalog {
        CatalogStatus::Unknown => return PageView::Loading,
        CatalogStatus::Failed(error) => {
            return PageView::Halted {
                notice: error.into(),
            }
        }
        CatalogStatus::Ready(catalog) => catalog,
    };

    PageView::Ready {
        sidebar: SidebarView {
            models: catalog.models().to_vec(),
            selected_model: state.config.selected_model.clone(),
            temperature: SliderView::new(&TEMPERATURE, state.config.temperature),
            top_p: SliderView::new(&TOP_P, state.config.top_p),
        },
        transcript: render_transcript(&state.conversation),
        pending: state.turn.partial().map(str::to_string),
        notice: state.notice.clone(),
    }
}
