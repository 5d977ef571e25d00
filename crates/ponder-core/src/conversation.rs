//! Conversation state and the reducer that folds stream events into it.

use ponder_proto::StreamEvent;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    step::{Step, format_observation},
    turn::Turn,
};

/// Whether a turn is currently streaming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Streaming,
}

/// What applying one event did to the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No turn in flight; the event was dropped
    Ignored,
    /// The in-flight turn changed
    Updated,
    /// The in-flight turn was committed at this position in the log
    Committed(usize),
}

/// Committed turn log plus at most one in-flight turn
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
    in_flight: Option<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed turns, oldest first
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The turn currently streaming, if any
    pub fn in_flight(&self) -> Option<&Turn> {
        self.in_flight.as_ref()
    }

    pub fn phase(&self) -> Phase {
        if self.in_flight.is_some() {
            Phase::Streaming
        } else {
            Phase::Idle
        }
    }

    pub fn is_idle(&self) -> bool {
        self.phase() == Phase::Idle
    }

    /// Start a turn for a user message
    pub fn begin(&mut self, user_message: impl Into<String>) -> Result<&Turn> {
        if self.in_flight.is_some() {
            return Err(Error::Busy);
        }
        Ok(self.in_flight.insert(Turn::new(user_message)))
    }

    /// Fold one event into the in-flight turn
    pub fn apply(&mut self, event: StreamEvent) -> Transition {
        let Some(turn) = self.in_flight.as_mut() else {
            tracing::debug!("No turn in flight, ignoring {} event", event.kind());
            return Transition::Ignored;
        };

        match event {
            StreamEvent::Plan { content } => {
                turn.plan = Some(content);
            }
            StreamEvent::Thought { content } => {
                // A re-emitted thought refines the first one instead of stacking
                match turn.steps.iter_mut().find(|s| s.is_thought()) {
                    Some(Step::Thought { content: existing }) => *existing = content,
                    _ => turn.steps.insert(0, Step::Thought { content }),
                }
            }
            StreamEvent::Step {
                index,
                thought,
                action,
                observation,
            } => {
                turn.steps.push(Step::Action {
                    index,
                    thought,
                    action,
                    observation: format_observation(&observation),
                });
            }
            StreamEvent::FinalAnswer { content } => {
                turn.final_text = Some(content);
                return self.commit();
            }
            StreamEvent::Error { content } => {
                turn.final_text = Some(format!("Error: {}", content));
                turn.is_error = true;
                return self.commit();
            }
        }

        Transition::Updated
    }

    fn commit(&mut self) -> Transition {
        match self.in_flight.take() {
            Some(turn) => {
                tracing::debug!(
                    "Committed turn {} with {} steps{}",
                    turn.id,
                    turn.steps.len(),
                    if turn.is_error { " (error)" } else { "" }
                );
                self.turns.push(turn);
                Transition::Committed(self.turns.len() - 1)
            }
            None => Transition::Ignored,
        }
    }

    /// Discard the in-flight turn without committing it
    pub fn cancel(&mut self) -> Option<Turn> {
        let turn = self.in_flight.take();
        if let Some(turn) = &turn {
            tracing::debug!("Discarded in-flight turn {}", turn.id);
        }
        turn
    }

    /// Flip whether a committed turn's trace is shown; returns the new state
    pub fn toggle_expanded(&mut self, index: usize) -> Result<bool> {
        let turn = self.turns.get_mut(index).ok_or(Error::NoSuchTurn(index + 1))?;
        turn.expanded = !turn.expanded;
        Ok(turn.expanded)
    }

    /// Show or hide one committed turn's trace
    pub fn set_expanded(&mut self, index: usize, expanded: bool) -> Result<()> {
        let turn = self.turns.get_mut(index).ok_or(Error::NoSuchTurn(index + 1))?;
        turn.expanded = expanded;
        Ok(())
    }

    /// Show or hide every committed trace
    pub fn set_all_expanded(&mut self, expanded: bool) {
        for turn in &mut self.turns {
            turn.expanded = expanded;
        }
    }

    /// Drop the committed log; refused while a turn is streaming
    pub fn clear(&mut self) -> Result<()> {
        if self.in_flight.is_some() {
            return Err(Error::Busy);
        }
        self.turns.clear();
        Ok(())
    }
}

/// Pure form of [`Conversation::apply`]
pub fn reduce(mut state: Conversation, event: StreamEvent) -> Conversation {
    state.apply(event);
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thought(content: &str) -> StreamEvent {
        StreamEvent::Thought {
            content: content.into(),
        }
    }

    fn step(index: u32, action: &str, observation: &str) -> StreamEvent {
        StreamEvent::Step {
            index,
            thought: format!("thinking about {}", action),
            action: action.into(),
            observation: observation.into(),
        }
    }

    fn streaming(message: &str) -> Conversation {
        let mut conv = Conversation::new();
        conv.begin(message).unwrap();
        conv
    }

    #[test]
    fn test_begin_rejects_second_turn() {
        let mut conv = streaming("first");
        assert_eq!(conv.phase(), Phase::Streaming);
        assert!(matches!(conv.begin("second"), Err(Error::Busy)));
        assert_eq!(conv.in_flight().unwrap().user_message, "first");
    }

    #[test]
    fn test_events_without_turn_are_ignored() {
        let mut conv = Conversation::new();
        assert_eq!(conv.apply(thought("stray")), Transition::Ignored);
        assert_eq!(
            conv.apply(StreamEvent::final_answer("stray")),
            Transition::Ignored
        );
        assert!(conv.turns().is_empty());
    }

    #[test]
    fn test_plan_is_not_a_step() {
        let mut conv = streaming("q");
        assert_eq!(
            conv.apply(StreamEvent::Plan {
                content: "1. look".into()
            }),
            Transition::Updated
        );
        let turn = conv.in_flight().unwrap();
        assert_eq!(turn.plan.as_deref(), Some("1. look"));
        assert!(turn.steps.is_empty());
    }

    #[test]
    fn test_thought_merge_is_idempotent() {
        let once = reduce(streaming("q"), thought("x"));
        let twice = reduce(reduce(streaming("q"), thought("x")), thought("x"));
        assert_eq!(once.in_flight().unwrap().steps, twice.in_flight().unwrap().steps);
        assert_eq!(twice.in_flight().unwrap().steps.len(), 1);
    }

    #[test]
    fn test_refined_thought_replaces_in_place_at_front() {
        let mut conv = streaming("q");
        conv.apply(step(1, "search", "a"));
        conv.apply(thought("draft"));
        conv.apply(step(2, "lookup", "b"));
        conv.apply(thought("refined"));

        let steps = &conv.in_flight().unwrap().steps;
        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps[0],
            Step::Thought {
                content: "refined".into()
            }
        );
        assert!(matches!(&steps[1], Step::Action { index: 1, .. }));
        assert!(matches!(&steps[2], Step::Action { index: 2, .. }));
    }

    #[test]
    fn test_steps_keep_arrival_order_not_index() {
        let mut conv = streaming("q");
        conv.apply(step(3, "c", ""));
        conv.apply(step(1, "a", ""));
        conv.apply(step(3, "c-again", ""));

        let actions: Vec<&str> = conv
            .in_flight()
            .unwrap()
            .steps
            .iter()
            .map(|s| match s {
                Step::Action { action, .. } => action.as_str(),
                Step::Thought { .. } => "thought",
            })
            .collect();
        assert_eq!(actions, vec!["c", "a", "c-again"]);
    }

    #[test]
    fn test_step_observation_is_formatted() {
        let conv = reduce(streaming("q"), step(1, "search", r#"{"result":[1,2]}"#));
        match &conv.in_flight().unwrap().steps[0] {
            Step::Action { observation, .. } => assert_eq!(observation, "[\n  1,\n  2\n]"),
            other => panic!("unexpected step: {:?}", other),
        }
    }

    #[test]
    fn test_final_answer_commits() {
        let mut conv = streaming("who?");
        conv.apply(thought("hm"));
        conv.apply(step(1, "search", "Musk"));
        assert_eq!(
            conv.apply(StreamEvent::final_answer("Elon Musk")),
            Transition::Committed(0)
        );

        assert_eq!(conv.phase(), Phase::Idle);
        let turn = &conv.turns()[0];
        assert_eq!(turn.final_text.as_deref(), Some("Elon Musk"));
        assert!(!turn.is_error);
        assert!(turn.expanded);
        assert_eq!(turn.steps.len(), 2);
        assert_eq!(turn.action_count(), 1);
    }

    #[test]
    fn test_error_commits_error_turn() {
        let mut conv = streaming("q");
        assert_eq!(
            conv.apply(StreamEvent::error("max iterations")),
            Transition::Committed(0)
        );
        let turn = &conv.turns()[0];
        assert_eq!(turn.final_text.as_deref(), Some("Error: max iterations"));
        assert!(turn.is_error);
    }

    #[test]
    fn test_terminal_is_exclusive() {
        let mut conv = streaming("q");
        conv.apply(StreamEvent::final_answer("first"));
        assert_eq!(
            conv.apply(StreamEvent::error("late")),
            Transition::Ignored
        );
        assert_eq!(conv.apply(step(9, "late", "")), Transition::Ignored);

        assert_eq!(conv.turns().len(), 1);
        let turn = &conv.turns()[0];
        assert_eq!(turn.final_text.as_deref(), Some("first"));
        assert!(turn.steps.is_empty());
    }

    #[test]
    fn test_cancel_discards_in_flight_state() {
        let mut conv = streaming("q");
        conv.apply(thought("partial"));
        conv.apply(step(1, "a", "b"));

        let discarded = conv.cancel().unwrap();
        assert_eq!(discarded.steps.len(), 2);
        assert_eq!(conv.phase(), Phase::Idle);
        assert!(conv.turns().is_empty());
        assert!(conv.cancel().is_none());

        conv.begin("next").unwrap();
        assert!(conv.in_flight().unwrap().steps.is_empty());
    }

    #[test]
    fn test_expansion_controls() {
        let mut conv = Conversation::new();
        for answer in ["a", "b"] {
            conv.begin("q").unwrap();
            conv.apply(StreamEvent::final_answer(answer));
        }

        assert!(!conv.toggle_expanded(1).unwrap());
        assert!(conv.turns()[0].expanded);
        assert!(!conv.turns()[1].expanded);

        conv.set_all_expanded(false);
        assert!(conv.turns().iter().all(|t| !t.expanded));
        conv.set_expanded(0, true).unwrap();
        assert!(conv.turns()[0].expanded);

        assert!(matches!(conv.toggle_expanded(5), Err(Error::NoSuchTurn(6))));
    }

    #[test]
    fn test_clear_only_when_idle() {
        let mut conv = streaming("q");
        conv.apply(StreamEvent::final_answer("done"));
        conv.begin("again").unwrap();
        assert!(matches!(conv.clear(), Err(Error::Busy)));
        assert_eq!(conv.turns().len(), 1);

        conv.cancel();
        conv.clear().unwrap();
        assert!(conv.turns().is_empty());
    }
}
