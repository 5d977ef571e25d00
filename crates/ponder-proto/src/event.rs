//! Stream event types

use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Events emitted by the agent backend while it works on one user message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Optional upfront plan
    Plan { content: String },
    /// Initial reasoning; may be re-emitted with a refined value
    Thought { content: String },
    /// One reason/act cycle
    Step {
        index: u32,
        thought: String,
        action: String,
        observation: String,
    },
    /// Turn finished successfully
    FinalAnswer { content: String },
    /// Turn failed
    Error { content: String },
}

impl StreamEvent {
    /// Check if this is a terminal event (FinalAnswer or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamEvent::FinalAnswer { .. } | StreamEvent::Error { .. }
        )
    }

    /// Wire discriminator of this event
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Plan { .. } => "plan",
            StreamEvent::Thought { .. } => "thought",
            StreamEvent::Step { .. } => "step",
            StreamEvent::FinalAnswer { .. } => "final_answer",
            StreamEvent::Error { .. } => "error",
        }
    }

    /// Build an error event
    pub fn error(content: impl Into<String>) -> Self {
        StreamEvent::Error {
            content: content.into(),
        }
    }

    /// Build a final answer event
    pub fn final_answer(content: impl Into<String>) -> Self {
        StreamEvent::FinalAnswer {
            content: content.into(),
        }
    }
}

/// A stream of decoded backend events
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;
