//! A single user-message/agent-response exchange

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::step::Step;

/// One exchange, including the reasoning trace that led to its answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    /// Milliseconds since the Unix epoch
    pub started_at: i64,
    pub user_message: String,
    pub plan: Option<String>,
    pub steps: Vec<Step>,
    /// Set once the turn is committed
    pub final_text: Option<String>,
    /// The final text came from an `Error` event
    pub is_error: bool,
    /// Whether the reasoning trace is shown
    pub expanded: bool,
}

impl Turn {
    /// Start an in-flight turn for a user message
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: chrono::Utc::now().timestamp_millis(),
            user_message: user_message.into(),
            plan: None,
            steps: Vec::new(),
            final_text: None,
            is_error: false,
            expanded: true,
        }
    }

    pub fn is_committed(&self) -> bool {
        self.final_text.is_some()
    }

    /// Number of thought/action/observation cycles
    pub fn action_count(&self) -> usize {
        self.steps.iter().filter(|s| !s.is_thought()).count()
    }

    /// Local wall-clock time the turn started, for display
    pub fn started_at_local(&self) -> Option<chrono::DateTime<chrono::Local>> {
        chrono::DateTime::from_timestamp_millis(self.started_at)
            .map(|t| t.with_timezone(&chrono::Local))
    }
}
