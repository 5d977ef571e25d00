//! Turn lifecycle: drives one transport stream per user message through the reducer

use futures::StreamExt;
use ponder_proto::Transport;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::{
    conversation::{Conversation, Transition},
    error::{Error, Result},
    events::SessionEvent,
    handle::SessionHandle,
};

/// How a [`ChatSession::send`] call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The turn was committed at this position in the log
    Committed(usize),
    /// The turn was cancelled or its stream ended without a terminal event
    Cancelled,
}

/// Owns the conversation and feeds it from a transport
pub struct ChatSession {
    conversation: Conversation,
    transport: Arc<dyn Transport>,
    event_tx: broadcast::Sender<SessionEvent>,
    handle: SessionHandle,
}

impl ChatSession {
    /// Create a session over a transport
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            conversation: Conversation::default(),
            transport,
            event_tx,
            handle: SessionHandle::new(),
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Get a cloneable handle for cancelling from another task
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Mutable access for presentation-only changes such as expansion
    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Swap the backend connection; only allowed between turns
    pub fn set_transport(&mut self, transport: Arc<dyn Transport>) -> Result<()> {
        if !self.conversation.is_idle() {
            return Err(Error::Busy);
        }
        self.transport = transport;
        Ok(())
    }

    /// Probe the backend
    pub async fn check_health(&self) -> Result<()> {
        Ok(self.transport.check_health().await?)
    }

    /// Send a user message and stream the agent's turn to completion.
    ///
    /// Events are applied in arrival order and broadcast as snapshots. If the
    /// stream ends without a terminal event, whether through cancellation or
    /// because the transport stopped, the in-flight turn is discarded. The same
    /// happens when this future is dropped before it completes.
    pub async fn send(&mut self, text: &str) -> Result<SendOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Other("message is empty".into()));
        }

        let turn = self.conversation.begin(text)?.clone();
        let cancel = self.handle.reset();
        tracing::info!(
            "Turn {} started over {} transport ({})",
            turn.id,
            self.transport.kind(),
            self.transport.endpoint()
        );
        let _ = self.event_tx.send(SessionEvent::TurnStarted { turn });

        let mut guard = TurnGuard { session: self };
        let mut events = guard.session.transport.open(text, cancel);
        let mut committed = None;

        while let Some(event) = events.next().await {
            let applied = event.clone();
            match guard.session.conversation.apply(event) {
                Transition::Updated => {
                    if let Some(turn) = guard.session.conversation.in_flight() {
                        let _ = guard.session.event_tx.send(SessionEvent::TurnUpdated {
                            turn: turn.clone(),
                            event: applied,
                        });
                    }
                }
                Transition::Committed(index) => {
                    let turn = guard.session.conversation.turns()[index].clone();
                    let _ = guard
                        .session
                        .event_tx
                        .send(SessionEvent::TurnCommitted { index, turn });
                    committed = Some(index);
                    break;
                }
                Transition::Ignored => {}
            }
        }
        drop(events);
        drop(guard);

        Ok(match committed {
            Some(index) => SendOutcome::Committed(index),
            None => SendOutcome::Cancelled,
        })
    }
}

/// Returns the session to idle when a turn ends, including when the `send`
/// future is dropped mid-stream. An uncommitted turn is discarded.
struct TurnGuard<'a> {
    session: &'a mut ChatSession,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if let Some(turn) = self.session.conversation.cancel() {
            self.session.handle.cancel();
            tracing::info!("Turn {} cancelled", turn.id);
            let _ = self
                .session
                .event_tx
                .send(SessionEvent::TurnCancelled { turn });
        }
        self.session.handle.mark_idle();
    }
}
