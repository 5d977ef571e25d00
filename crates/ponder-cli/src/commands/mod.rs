//! Slash commands for interactive mode

use ponder_core::Conversation;

use crate::utils::truncate_chars;

/// Result of executing a slash command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Show a message to the user (not sent to the agent)
    Message(String),
    /// Show an error to the user
    Error(String),
    /// Trace expansion changed; views should re-read the conversation
    TraceChanged(String),
    /// The conversation was cleared
    Clear,
    /// Probe the backend
    CheckHealth,
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command
pub fn execute_command(input: &str, conversation: &mut Conversation) -> Option<CommandResult> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next().unwrap_or("").to_lowercase();
    let args = parts.next().map(str::trim).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "clear" | "c" => match conversation.clear() {
            Ok(()) => CommandResult::Clear,
            Err(e) => CommandResult::Error(e.to_string()),
        },

        "expand" | "e" => set_expanded(conversation, args, true),

        "collapse" => set_expanded(conversation, args, false),

        "toggle" | "t" => match parse_turn_number(args, conversation) {
            Ok(Some(n)) => match conversation.toggle_expanded(n - 1) {
                Ok(true) => CommandResult::TraceChanged(format!("Showing reasoning for turn #{}", n)),
                Ok(false) => CommandResult::TraceChanged(format!("Hiding reasoning for turn #{}", n)),
                Err(e) => CommandResult::Error(e.to_string()),
            },
            Ok(None) => CommandResult::Error("Usage: /toggle <n>".to_string()),
            Err(msg) => CommandResult::Error(msg),
        },

        "health" => CommandResult::CheckHealth,

        "history" | "hist" => CommandResult::Message(history_message(conversation)),

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(command),
    })
}

/// `None` when no number was given
fn parse_turn_number(args: &str, conversation: &Conversation) -> Result<Option<usize>, String> {
    if args.is_empty() {
        return Ok(None);
    }
    let count = conversation.turns().len();
    match args.parse::<usize>() {
        Ok(n) if n >= 1 && n <= count => Ok(Some(n)),
        Ok(n) if count == 0 => Err(format!("No turn #{}: the conversation is empty", n)),
        Ok(n) => Err(format!("No turn #{} (turns are numbered 1-{})", n, count)),
        Err(_) => Err(format!("Expected a turn number, got '{}'", args)),
    }
}

fn set_expanded(conversation: &mut Conversation, args: &str, expanded: bool) -> CommandResult {
    let verb = if expanded { "Showing" } else { "Hiding" };
    match parse_turn_number(args, conversation) {
        Ok(Some(n)) => match conversation.set_expanded(n - 1, expanded) {
            Ok(()) => CommandResult::TraceChanged(format!("{} reasoning for turn #{}", verb, n)),
            Err(e) => CommandResult::Error(e.to_string()),
        },
        Ok(None) => {
            conversation.set_all_expanded(expanded);
            CommandResult::TraceChanged(format!("{} reasoning for all turns", verb))
        }
        Err(msg) => CommandResult::Error(msg),
    }
}

fn history_message(conversation: &Conversation) -> String {
    let turns = conversation.turns();
    if turns.is_empty() {
        return "No turns yet.".to_string();
    }

    let mut out = String::from("Conversation:");
    for (i, turn) in turns.iter().enumerate() {
        let marker = if turn.is_error { "✗" } else { "✓" };
        let answer = turn.final_text.as_deref().unwrap_or("").replace('\n', " ");
        out.push_str(&format!(
            "\n  #{} {} [{} steps{}] {} → {}",
            i + 1,
            marker,
            turn.action_count(),
            if turn.expanded { "" } else { ", hidden" },
            truncate_chars(&turn.user_message.replace('\n', " "), 40),
            truncate_chars(&answer, 60),
        ));
    }
    out
}

pub fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?        Show this help message
  /expand, /e [n]      Show the reasoning of turn n (all turns if omitted)
  /collapse [n]        Hide the reasoning of turn n (all turns if omitted)
  /toggle, /t <n>      Show or hide the reasoning of turn n
  /history             List the turns in this conversation
  /health              Check that the backend is reachable
  /clear, /c           Clear conversation history
  /quit, /exit, /q     Exit ponder

Keys (TUI):
  Ctrl+E               Show or hide the latest turn's reasoning
  Ctrl+O               Show or hide every turn's reasoning
  Esc / Ctrl+C         Cancel the running turn"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ponder_proto::StreamEvent;

    fn conversation(turns: usize) -> Conversation {
        let mut conv = Conversation::new();
        for i in 0..turns {
            conv.begin(format!("question {}", i + 1)).unwrap();
            conv.apply(StreamEvent::Step {
                index: 1,
                thought: String::new(),
                action: "search".into(),
                observation: String::new(),
            });
            conv.apply(StreamEvent::final_answer(format!("answer {}", i + 1)));
        }
        conv
    }

    #[test]
    fn test_not_a_command() {
        assert_eq!(execute_command("hello", &mut Conversation::new()), None);
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            execute_command("/Frobnicate now", &mut Conversation::new()),
            Some(CommandResult::Unknown("frobnicate".into()))
        );
    }

    #[test]
    fn test_toggle_by_number() {
        let mut conv = conversation(2);
        assert_eq!(
            execute_command("/toggle 2", &mut conv),
            Some(CommandResult::TraceChanged("Hiding reasoning for turn #2".into()))
        );
        assert!(conv.turns()[0].expanded);
        assert!(!conv.turns()[1].expanded);
    }

    #[test]
    fn test_toggle_rejects_bad_numbers() {
        let mut conv = conversation(1);
        for input in ["/toggle", "/toggle 0", "/toggle 2", "/toggle two"] {
            assert!(
                matches!(execute_command(input, &mut conv), Some(CommandResult::Error(_))),
                "{}",
                input
            );
        }
        assert!(conv.turns()[0].expanded);
    }

    #[test]
    fn test_collapse_and_expand_all() {
        let mut conv = conversation(3);
        execute_command("/collapse", &mut conv);
        assert!(conv.turns().iter().all(|t| !t.expanded));

        execute_command("/expand 2", &mut conv);
        let expanded: Vec<bool> = conv.turns().iter().map(|t| t.expanded).collect();
        assert_eq!(expanded, vec![false, true, false]);
    }

    #[test]
    fn test_clear_refused_while_streaming() {
        let mut conv = conversation(1);
        conv.begin("pending").unwrap();
        assert!(matches!(
            execute_command("/clear", &mut conv),
            Some(CommandResult::Error(_))
        ));
        conv.cancel();
        assert_eq!(execute_command("/clear", &mut conv), Some(CommandResult::Clear));
        assert!(conv.turns().is_empty());
    }

    #[test]
    fn test_history_lists_turns() {
        let mut conv = conversation(2);
        match execute_command("/history", &mut conv) {
            Some(CommandResult::Message(text)) => {
                assert!(text.contains("#1 ✓ [1 steps] question 1 → answer 1"));
                assert!(text.contains("#2"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(
            execute_command("/history", &mut Conversation::new()),
            Some(CommandResult::Message("No turns yet.".into()))
        );
    }

    #[test]
    fn test_simple_commands() {
        let mut conv = Conversation::new();
        assert_eq!(execute_command("/q", &mut conv), Some(CommandResult::Exit));
        assert_eq!(execute_command("/health", &mut conv), Some(CommandResult::CheckHealth));
        assert!(matches!(execute_command("/help", &mut conv), Some(CommandResult::Message(_))));
    }
}
