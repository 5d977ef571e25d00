//! Shared utilities

use ponder_core::{ChatSession, SendOutcome, SessionEvent, Step};
use ponder_proto::StreamEvent;
use std::time::Duration;

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

fn indent(text: &str, pad: &str) -> String {
    text.lines()
        .map(|line| format!("{}{}", pad, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Plain-text rendering of one session event for line mode.
///
/// Returns `None` for events with nothing new to show.
pub fn format_update(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::TurnStarted { .. } => None,
        SessionEvent::TurnUpdated { turn, event } => match event {
            StreamEvent::Plan { content } => Some(format!("[plan]\n{}", indent(content, "  "))),
            StreamEvent::Thought { content } => Some(format!("💭 {}", content)),
            StreamEvent::Step { .. } => match turn.steps.last() {
                Some(Step::Action {
                    index,
                    thought,
                    action,
                    observation,
                }) => {
                    let mut out = format!("[step {}]", index);
                    if !thought.is_empty() {
                        out.push_str(&format!("\n  thought: {}", thought));
                    }
                    if !action.is_empty() {
                        out.push_str(&format!("\n  action: {}", action));
                    }
                    if !observation.is_empty() {
                        out.push_str(&format!(
                            "\n  observation:\n{}",
                            indent(&truncate_chars(observation, 2000), "    ")
                        ));
                    }
                    Some(out)
                }
                _ => None,
            },
            StreamEvent::FinalAnswer { .. } | StreamEvent::Error { .. } => None,
        },
        SessionEvent::TurnCommitted { turn, .. } => {
            let text = turn.final_text.as_deref().unwrap_or_default();
            Some(format!("\n{}", text))
        }
        SessionEvent::TurnCancelled { .. } => Some("[cancelled]".to_string()),
    }
}

/// Send one message, cancelling it if it outlives `timeout`
pub async fn send_with_timeout(
    session: &mut ChatSession,
    text: &str,
    timeout: Option<Duration>,
) -> ponder_core::Result<SendOutcome> {
    let watchdog = timeout.map(|limit| {
        let handle = session.handle();
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            tracing::warn!("Turn exceeded {:?}, cancelling", limit);
            handle.cancel();
        })
    });

    let result = session.send(text).await;

    if let Some(watchdog) = watchdog {
        watchdog.abort();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use ponder_core::Conversation;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo...");
    }

    fn updated(conv: &mut Conversation, event: StreamEvent) -> SessionEvent {
        conv.apply(event.clone());
        SessionEvent::TurnUpdated {
            turn: conv.in_flight().unwrap().clone(),
            event,
        }
    }

    #[test]
    fn test_format_step_uses_formatted_observation() {
        let mut conv = Conversation::new();
        conv.begin("q").unwrap();
        let event = updated(
            &mut conv,
            StreamEvent::Step {
                index: 2,
                thought: "check".into(),
                action: "search(x)".into(),
                observation: r#"{"result":{"hits":1}}"#.into(),
            },
        );

        assert_eq!(
            format_update(&event).unwrap(),
            "[step 2]\n  thought: check\n  action: search(x)\n  observation:\n    {\n      \"hits\": 1\n    }"
        );
    }

    #[test]
    fn test_format_plan_and_thought() {
        let mut conv = Conversation::new();
        conv.begin("q").unwrap();
        let plan = updated(
            &mut conv,
            StreamEvent::Plan {
                content: "1. a\n2. b".into(),
            },
        );
        assert_eq!(format_update(&plan).unwrap(), "[plan]\n  1. a\n  2. b");

        let thought = updated(
            &mut conv,
            StreamEvent::Thought {
                content: "hm".into(),
            },
        );
        assert_eq!(format_update(&thought).unwrap(), "💭 hm");
    }

    #[test]
    fn test_format_terminal_events() {
        let mut conv = Conversation::new();
        let turn = conv.begin("q").unwrap().clone();
        assert_eq!(
            format_update(&SessionEvent::TurnStarted { turn: turn.clone() }),
            None
        );
        assert_eq!(
            format_update(&SessionEvent::TurnCancelled { turn }).as_deref(),
            Some("[cancelled]")
        );

        conv.apply(StreamEvent::error("boom"));
        let committed = SessionEvent::TurnCommitted {
            index: 0,
            turn: conv.turns()[0].clone(),
        };
        assert_eq!(format_update(&committed).unwrap(), "\nError: boom");
    }
}
