//! Session event types

use ponder_proto::StreamEvent;
use serde::{Deserialize, Serialize};

use crate::turn::Turn;

/// Events broadcast while a turn runs, carrying snapshots for the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A user message was accepted and its turn is in flight
    TurnStarted { turn: Turn },

    /// The in-flight turn changed after applying `event`
    TurnUpdated { turn: Turn, event: StreamEvent },

    /// The turn finished and is now at `index` in the committed log
    TurnCommitted { index: usize, turn: Turn },

    /// The turn was cancelled or its stream ended early; nothing was committed
    TurnCancelled { turn: Turn },
}

impl SessionEvent {
    /// The turn snapshot this event carries
    pub fn turn(&self) -> &Turn {
        match self {
            SessionEvent::TurnStarted { turn }
            | SessionEvent::TurnUpdated { turn, .. }
            | SessionEvent::TurnCommitted { turn, .. }
            | SessionEvent::TurnCancelled { turn } => turn,
        }
    }

    /// Check if this event ends the turn
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::TurnCommitted { .. } | SessionEvent::TurnCancelled { .. }
        )
    }
}
