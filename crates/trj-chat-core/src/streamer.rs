//! Response streamer: drives one user turn from input to stored reply.

use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::ai::InferenceService;
use crate::error::{ChatError, Result};
use crate::session::Session;
use crate::state::{ChatMessage, Notice};

/// Observable effects of a turn, emitted in the order they happen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    UserMessage { message: ChatMessage },
    AssistantStart,
    Fragment { text: String },
    AssistantDone { message: ChatMessage },
    Notice(Notice),
}

/// Runs a full turn for `input`, forwarding each effect to `events`.
///
/// Returns the stored assistant reply, or `None` when the input was blank.
/// Every error has already been recorded on the session and emitted as a
/// notice when this returns.
pub async fn run_turn<E>(
    session: &mut Session,
    service: &dyn InferenceService,
    input: &str,
    events: &UnboundedSender<E>,
) -> Result<Option<ChatMessage>>
where
    E: From<TurnEvent> + Send,
{
    // A closed receiver only means nobody is watching; the turn still completes
    let emit = |event: TurnEvent| {
        let _ = events.send(E::from(event));
    };

    let request = match session.submit(input) {
        Ok(Some(request)) => request,
        Ok(None) => return Ok(None),
        Err(error) => {
            if error == ChatError::NoModelSelected {
                if let Some(message) = session.state().conversation.last() {
                    emit(TurnEvent::UserMessage {
                        message: message.clone(),
                    });
                }
            }
            emit(TurnEvent::Notice((&error).into()));
            return Err(error);
        }
    };

    if let Some(message) = request.messages.last() {
        emit(TurnEvent::UserMessage {
            message: message.clone(),
        });
    }
    emit(TurnEvent::AssistantStart);

    let mut fragments = match service.chat_stream(request).await {
        Ok(stream) => stream,
        Err(error) => {
            let error = session.interrupt_turn(error);
            emit(TurnEvent::Notice((&error).into()));
            return Err(error);
        }
    };

    while let Some(item) = fragments.next().await {
        match item {
            Ok(text) => {
                session.push_fragment(&text);
                emit(TurnEvent::Fragment { text });
            }
            Err(error) => {
                let error = session.interrupt_turn(error);
                emit(TurnEvent::Notice((&error).into()));
                return Err(error);
            }
        }
    }

    let message = session.complete_turn();
    if let Some(message) = &message {
        tracing::info!(chars = message.content.chars().count(), "assistant reply complete");
        emit(TurnEvent::AssistantDone {
            message: message.clone(),
        });
    }
    Ok(message)
}
