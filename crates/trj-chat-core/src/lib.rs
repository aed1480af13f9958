pub mod ai;
pub mod catalog;
pub mod config;
pub mod error;
pub mod markdown;
pub mod panel;
pub mod render;
pub mod session;
pub mod state;
pub mod streamer;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use ai::{ChatRequest, FragmentStream, InferenceService, OllamaClient};
pub use catalog::ModelCatalog;
pub use config::Config;
pub use error::{ChatError, Result};
pub use markdown::{parse_blocks, parse_inline, InlineSpan, InlineStyle, MarkdownBlock};
pub use panel::{ConfigChange, SelectionPolicy, SliderSpec, TEMPERATURE, TOP_P};
pub use render::{PageView, RenderedMessage, SidebarView, SliderView};
pub use session::Session;
pub use state::{ChatMessage, ChatRole, Notice, NoticeLevel, SessionState, TurnState};
pub use streamer::{run_turn, TurnEvent};
