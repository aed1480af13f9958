//! JSON frames exchanged with the browser over the session WebSocket.

use serde::{Deserialize, Serialize};
use trj_chat_core::{ConfigChange, PageView, TurnEvent};

/// Something the user did in the page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    SelectModel {
        #[serde(default)]
        model: Option<String>,
    },
    SetTemperature {
        value: f64,
    },
    SetTopP {
        value: f64,
    },
    Submit {
        text: String,
    },
    Refresh,
}

impl ClientEvent {
    /// Sidebar edits, if this event is one.
    pub fn config_change(&self) -> Option<ConfigChange> {
        match self {
            // The dropdown's placeholder option posts an empty string
            ClientEvent::SelectModel { model } => Some(ConfigChange::SelectModel(
                model.clone().filter(|m| !m.is_empty()),
            )),
            ClientEvent::SetTemperature { value } => Some(ConfigChange::SetTemperature(*value)),
            ClientEvent::SetTopP { value } => Some(ConfigChange::SetTopP(*value)),
            ClientEvent::Submit { .. } | ClientEvent::Refresh => None,
        }
    }
}

/// Everything the server pushes to the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Full redraw of sidebar and transcript
    Page { page: PageView },
    /// Incremental update while a turn runs
    Event { event: TurnEvent },
}

impl From<TurnEvent> for ServerFrame {
    fn from(event: TurnEvent) -> Self {
        ServerFrame::Event { event }
    }
}
