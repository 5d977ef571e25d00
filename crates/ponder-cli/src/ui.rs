//! TUI implementation for ponder

use tokio::sync::mpsc;

use crossterm::event::{Event, EventStream, MouseEventKind};
use futures::StreamExt;
use ponder_core::{ChatSession, Conversation, SessionEvent, Turn};
use ponder_proto::StreamEvent;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};
use std::time::Instant;
use ponder_tui::{
    Theme,
    input::Action,
    widgets::{Entry, InputBox, Spinner, TurnList, turn_list},
};

use crate::{
    Settings,
    commands::{CommandResult, execute_command},
    utils::truncate_chars,
};

/// Messages sent from UI to the session handler
#[derive(Debug)]
pub enum UiMessage {
    /// User submitted a message
    Submit(String),
    /// Slash command
    Command(String),
    /// Show or hide the latest turn's reasoning
    ToggleLatest,
    /// Show or hide every turn's reasoning
    ToggleAll,
    /// Clear the transcript
    Clear,
    Quit,
}

/// TUI application state
pub struct TuiState {
    /// Committed turns and notices, in display order
    entries: Vec<Entry>,
    /// Snapshot of the streaming turn
    in_flight: Option<Turn>,
    input: InputBox,
    scroll: usize,
    is_processing: bool,
    status: String,
    theme: Theme,
    /// Shown in the transcript title
    backend: String,
    ui_tx: mpsc::Sender<UiMessage>,
    /// Start of the running turn, for the spinner
    spinner_start: Instant,
}

impl TuiState {
    pub fn new(settings: &Settings, ui_tx: mpsc::Sender<UiMessage>) -> Self {
        let mut input = InputBox::new().with_placeholder("Ask the agent something...");
        input.set_focused(true);

        Self {
            entries: vec![],
            in_flight: None,
            input,
            scroll: 0,
            is_processing: false,
            status: "Ready".to_string(),
            theme: Theme::dark(),
            backend: format!("{} · {}", settings.endpoint, settings.transport),
            ui_tx,
            spinner_start: Instant::now(),
        }
    }

    /// Handle session events
    pub fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::TurnStarted { turn } => {
                self.is_processing = true;
                self.spinner_start = Instant::now();
                self.status = "Waiting for the agent...".to_string();
                self.in_flight = Some(turn);
            }
            SessionEvent::TurnUpdated { turn, event } => {
                self.status = match &event {
                    StreamEvent::Plan { .. } => "Planning...".to_string(),
                    StreamEvent::Thought { .. } => "Thinking...".to_string(),
                    StreamEvent::Step { index, action, .. } => {
                        format!("Step {}: {}", index, truncate_chars(action, 40))
                    }
                    StreamEvent::FinalAnswer { .. } | StreamEvent::Error { .. } => {
                        "Finishing...".to_string()
                    }
                };
                self.in_flight = Some(turn);
            }
            SessionEvent::TurnCommitted { turn, .. } => {
                self.is_processing = false;
                self.status = if turn.is_error {
                    "Turn failed".to_string()
                } else {
                    format!(
                        "Ready │ last turn: {} steps in {:.1}s",
                        turn.action_count(),
                        self.spinner_start.elapsed().as_secs_f32()
                    )
                };
                self.in_flight = None;
                self.entries.push(Entry::Turn(turn));
            }
            SessionEvent::TurnCancelled { turn } => {
                self.is_processing = false;
                self.status = "Cancelled".to_string();
                self.in_flight = None;
                self.entries.push(Entry::error(format!(
                    "Turn cancelled, nothing was saved: {}",
                    truncate_chars(&turn.user_message, 60)
                )));
            }
        }
        self.scroll_to_bottom();
    }

    /// Re-read committed turns after expansion changes or a clear
    fn sync_turns(&mut self, conversation: &Conversation) {
        let turns = conversation.turns();
        self.entries.retain(|entry| match entry {
            Entry::Turn(turn) => turns.iter().any(|t| t.id == turn.id),
            Entry::Notice { .. } => true,
        });
        for entry in &mut self.entries {
            if let Entry::Turn(turn) = entry {
                if let Some(current) = turns.iter().find(|t| t.id == turn.id) {
                    turn.expanded = current.expanded;
                }
            }
        }
    }

    fn scroll_to_bottom(&mut self) {
        // Will be calculated during render based on content height
        self.scroll = usize::MAX;
    }

    fn show_notice(&mut self, text: impl Into<String>) {
        self.entries.push(Entry::notice(text));
        self.scroll_to_bottom();
    }

    fn show_error(&mut self, text: impl Into<String>) {
        self.entries.push(Entry::error(text));
        self.scroll_to_bottom();
    }

    /// Handle a keyboard action while idle; returns `false` to quit
    pub async fn handle_action(&mut self, action: Action, width: u16) -> bool {
        match action {
            Action::Submit => {
                if let Some(content) = self.input.submit() {
                    let msg = if content.starts_with('/') {
                        UiMessage::Command(content)
                    } else {
                        UiMessage::Submit(content)
                    };
                    let _ = self.ui_tx.send(msg).await;
                }
                true
            }
            Action::Quit | Action::Interrupt => {
                let _ = self.ui_tx.send(UiMessage::Quit).await;
                false
            }
            Action::Eof if self.input.is_empty() => {
                let _ = self.ui_tx.send(UiMessage::Quit).await;
                false
            }
            Action::Escape => {
                self.input.clear();
                true
            }
            Action::PageUp => {
                self.scroll = self.scroll.saturating_sub(10);
                true
            }
            Action::PageDown => {
                self.scroll = self.scroll.saturating_add(10);
                true
            }
            Action::Clear => {
                let _ = self.ui_tx.send(UiMessage::Clear).await;
                true
            }
            Action::ToggleTrace => {
                let _ = self.ui_tx.send(UiMessage::ToggleLatest).await;
                true
            }
            Action::ToggleAllTraces => {
                let _ = self.ui_tx.send(UiMessage::ToggleAll).await;
                true
            }
            _ => {
                self.input.handle_action(&action, width);
                true
            }
        }
    }

    /// Render the UI
    pub fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),    // Transcript
                Constraint::Length(1), // Status
                Constraint::Length(3), // Input
            ])
            .split(size);

        self.render_transcript(frame, chunks[0]);
        self.render_status(frame, chunks[1]);

        let title = if self.is_processing {
            Some(" Esc to cancel ")
        } else {
            None
        };
        self.input
            .render(chunks[2], frame.buffer_mut(), &self.theme, title);
    }

    fn render_welcome(&self, frame: &mut Frame, area: Rect) {
        let key = |k: &'static str, what: &'static str| {
            Line::from(vec![
                Span::styled(format!("    {:<10}", k), self.theme.accent_style()),
                Span::styled(what, self.theme.base_style()),
            ])
        };
        let welcome = Paragraph::new(vec![
            Line::from(""),
            Line::from(vec![
                Span::styled("  ponder", self.theme.accent_bold()),
                Span::styled(" - watch a reasoning agent think", self.theme.dim_style()),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                format!("  Backend: {}", self.backend),
                self.theme.dim_style(),
            )),
            Line::from(""),
            Line::from(Span::styled("  Keybindings", self.theme.warning_style())),
            Line::from(""),
            key("Enter", "Send message"),
            key("Ctrl+E", "Show/hide the latest reasoning trace"),
            key("Ctrl+O", "Show/hide all reasoning traces"),
            key("Ctrl+L", "Clear conversation"),
            key("Esc", "Cancel the running turn"),
            key("Ctrl+C", "Cancel / Quit"),
            key("PgUp/Dn", "Scroll history"),
            Line::from(""),
            Line::from(Span::styled(
                "  Type a question, or /help for commands...",
                self.theme.dim_style(),
            )),
        ]);
        frame.render_widget(welcome, area);
    }

    fn render_transcript(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style())
            .title(format!(" ponder │ {} ", self.backend));

        let inner = block.inner(area);
        frame.render_widget(block, area);

        if inner.height == 0 {
            return;
        }
        if self.entries.is_empty() && self.in_flight.is_none() {
            self.render_welcome(frame, inner);
            return;
        }

        // Leave a column for the scrollbar
        let width = inner.width.saturating_sub(1) as usize;
        let content_height =
            turn_list::transcript_height(&self.entries, self.in_flight.as_ref(), width);
        let max_scroll = content_height.saturating_sub(inner.height as usize);
        self.scroll = self.scroll.min(max_scroll);

        let list_area = Rect {
            width: inner.width.saturating_sub(1),
            ..inner
        };
        let list = TurnList::new(&self.entries, &self.theme)
            .in_flight(self.in_flight.as_ref(), self.spinner_start.elapsed())
            .scroll(self.scroll);
        frame.render_widget(list, list_area);

        if content_height > inner.height as usize {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .track_symbol(Some("│"))
                .thumb_symbol("█");

            let mut scrollbar_state = ScrollbarState::new(max_scroll).position(self.scroll);

            frame.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
        }
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        if self.is_processing {
            let spinner =
                Spinner::new(&self.status, &self.theme).with_start_time(self.spinner_start);
            frame.render_widget(spinner, area);
            return;
        }

        let left = self.status.as_str();
        let right = "Ctrl+E: trace │ /help │ Ctrl+C: quit";
        let left_width = left.chars().count();
        let right_width = right.chars().count();
        let available = area.width as usize;

        let line = if left_width + right_width + 2 <= available {
            Line::from(vec![
                Span::styled(left, self.theme.dim_style()),
                Span::raw(" ".repeat(available - left_width - right_width)),
                Span::styled(right, self.theme.border_style()),
            ])
        } else {
            Line::from(Span::styled(left, self.theme.dim_style()))
        };
        frame.render_widget(Paragraph::new(line), area);
    }
}

/// Apply a slash command and reflect its result in the view
async fn run_slash_command(
    state: &mut TuiState,
    session: &mut ChatSession,
    settings: &Settings,
    input: &str,
) -> bool {
    let Some(result) = execute_command(input, session.conversation_mut()) else {
        return true;
    };
    match result {
        CommandResult::Message(msg) => state.show_notice(msg),
        CommandResult::Error(msg) => state.show_error(msg),
        CommandResult::TraceChanged(msg) => {
            state.sync_turns(session.conversation());
            state.status = msg;
        }
        CommandResult::Clear => {
            state.entries.clear();
            state.status = "Cleared".to_string();
        }
        CommandResult::CheckHealth => {
            state.status = "Checking backend...".to_string();
            match session.check_health().await {
                Ok(()) => state.show_notice(format!("Backend at {} is healthy.", settings.endpoint)),
                Err(ponder_core::Error::Proto(e)) => {
                    state.show_error(e.remediation(settings.endpoint.base()))
                }
                Err(e) => state.show_error(e.to_string()),
            }
            state.status = "Ready".to_string();
        }
        CommandResult::Exit => return false,
        CommandResult::Unknown(cmd) => state.show_error(format!(
            "Unknown command: /{}\nType /help for available commands.",
            cmd
        )),
    }
    true
}

/// Run the TUI application
pub async fn run_tui(session: &mut ChatSession, settings: &Settings) -> anyhow::Result<()> {
    use crossterm::{
        event::{DisableMouseCapture, EnableMouseCapture},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    };
    use ratatui::{Terminal, backend::CrosstermBackend};
    use std::io;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (ui_tx, mut ui_rx) = mpsc::channel::<UiMessage>(32);
    let mut state = TuiState::new(settings, ui_tx);
    let mut session_rx = session.subscribe();
    let mut event_stream = EventStream::new();

    // Tick interval for animations (80ms for smooth spinner)
    let mut tick_interval = tokio::time::interval(std::time::Duration::from_millis(80));

    let mut pending_prompt: Option<String> = None;

    let result: anyhow::Result<()> = 'outer: loop {
        if let Some(content) = pending_prompt.take() {
            let cancel_handle = session.handle();
            let mut send_future = std::pin::pin!(crate::utils::send_with_timeout(
                session,
                &content,
                settings.timeout
            ));

            loop {
                terminal.draw(|frame| state.render(frame))?;
                let area_width = terminal.size()?.width;

                tokio::select! {
                    biased;

                    result = &mut send_future => {
                        if let Err(e) = result {
                            state.show_error(format!("Error: {}", e));
                        }
                        break;
                    }

                    event = session_rx.recv() => {
                        if let Ok(session_event) = event {
                            state.handle_session_event(session_event);
                        }
                    }

                    event = event_stream.next() => {
                        match event {
                            Some(Ok(Event::Key(key))) => {
                                let action = ponder_tui::input::key_to_action(key);
                                match action {
                                    Action::Interrupt | Action::Escape => {
                                        cancel_handle.cancel();
                                        state.status = "Cancelling...".to_string();
                                    }
                                    Action::Quit => {
                                        cancel_handle.cancel();
                                        break 'outer Ok(());
                                    }
                                    Action::PageUp => state.scroll = state.scroll.saturating_sub(10),
                                    Action::PageDown => state.scroll = state.scroll.saturating_add(10),
                                    Action::Submit => {}
                                    _ => {
                                        // Typing continues while the agent works
                                        state.input.handle_action(&action, area_width);
                                    }
                                }
                            }
                            Some(Ok(Event::Paste(text))) => {
                                state.input.handle_action(&Action::Paste(text), area_width);
                            }
                            Some(Ok(Event::Mouse(mouse))) => match mouse.kind {
                                MouseEventKind::ScrollUp => state.scroll = state.scroll.saturating_sub(3),
                                MouseEventKind::ScrollDown => state.scroll = state.scroll.saturating_add(3),
                                _ => {}
                            },
                            Some(Err(e)) => {
                                cancel_handle.cancel();
                                break 'outer Err(anyhow::anyhow!("Event error: {}", e));
                            }
                            None => {
                                cancel_handle.cancel();
                                break 'outer Ok(());
                            }
                            _ => {}
                        }
                    }

                    _ = tick_interval.tick() => {}
                }
            }

            // Drain events broadcast just before the turn finished
            while let Ok(session_event) = session_rx.try_recv() {
                state.handle_session_event(session_event);
            }
            continue;
        }

        terminal.draw(|frame| state.render(frame))?;
        let area_width = terminal.size()?.width;

        tokio::select! {
            biased;

            event = event_stream.next() => {
                match event {
                    Some(Ok(Event::Key(key))) => {
                        let action = ponder_tui::input::key_to_action(key);
                        if !state.handle_action(action, area_width).await {
                            break Ok(());
                        }
                    }
                    Some(Ok(Event::Paste(text))) => {
                        state.handle_action(Action::Paste(text), area_width).await;
                    }
                    Some(Ok(Event::Mouse(mouse))) => match mouse.kind {
                        MouseEventKind::ScrollUp => state.scroll = state.scroll.saturating_sub(3),
                        MouseEventKind::ScrollDown => state.scroll = state.scroll.saturating_add(3),
                        _ => {}
                    },
                    Some(Err(e)) => break Err(anyhow::anyhow!("Event error: {}", e)),
                    None => break Ok(()),
                    _ => {}
                }
            }

            _ = tick_interval.tick() => {}

            msg = ui_rx.recv() => {
                match msg {
                    Some(UiMessage::Submit(content)) => {
                        pending_prompt = Some(content);
                    }
                    Some(UiMessage::Command(cmd)) => {
                        if !run_slash_command(&mut state, session, settings, &cmd).await {
                            break Ok(());
                        }
                    }
                    Some(UiMessage::ToggleLatest) => {
                        let count = session.conversation().turns().len();
                        if count > 0 {
                            let _ = session.conversation_mut().toggle_expanded(count - 1);
                            state.sync_turns(session.conversation());
                        }
                    }
                    Some(UiMessage::ToggleAll) => {
                        let conversation = session.conversation_mut();
                        let any_expanded = conversation.turns().iter().any(|t| t.expanded);
                        conversation.set_all_expanded(!any_expanded);
                        state.sync_turns(session.conversation());
                    }
                    Some(UiMessage::Clear) => {
                        match session.conversation_mut().clear() {
                            Ok(()) => {
                                state.entries.clear();
                                state.status = "Cleared".to_string();
                            }
                            Err(e) => state.show_error(e.to_string()),
                        }
                    }
                    Some(UiMessage::Quit) | None => break Ok(()),
                }
            }
        }
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use ponder_proto::{Endpoint, TransportKind};

    fn state() -> (TuiState, mpsc::Receiver<UiMessage>) {
        let settings = Settings {
            endpoint: Endpoint::default(),
            transport: TransportKind::Stream,
            timeout: None,
        };
        let (tx, rx) = mpsc::channel(8);
        (TuiState::new(&settings, tx), rx)
    }

    fn committed(conv: &mut Conversation, answer: &str) -> Turn {
        conv.begin("q").unwrap();
        conv.apply(StreamEvent::Thought {
            content: "hm".into(),
        });
        conv.apply(StreamEvent::final_answer(answer));
        conv.turns().last().unwrap().clone()
    }

    #[test]
    fn test_session_events_drive_view() {
        let (mut state, _rx) = state();
        let mut conv = Conversation::new();
        let started = conv.begin("q").unwrap().clone();

        state.handle_session_event(SessionEvent::TurnStarted { turn: started });
        assert!(state.is_processing);
        assert!(state.in_flight.is_some());

        conv.apply(StreamEvent::Step {
            index: 4,
            thought: String::new(),
            action: "lookup".into(),
            observation: String::new(),
        });
        state.handle_session_event(SessionEvent::TurnUpdated {
            turn: conv.in_flight().unwrap().clone(),
            event: StreamEvent::Step {
                index: 4,
                thought: String::new(),
                action: "lookup".into(),
                observation: String::new(),
            },
        });
        assert_eq!(state.status, "Step 4: lookup");

        let cancelled = conv.cancel().unwrap();
        state.handle_session_event(SessionEvent::TurnCancelled { turn: cancelled });
        assert!(!state.is_processing);
        assert!(state.in_flight.is_none());
        assert!(matches!(&state.entries[..], [Entry::Notice { is_error: true, .. }]));
    }

    #[test]
    fn test_sync_turns_follows_conversation() {
        let (mut state, _rx) = state();
        let mut conv = Conversation::new();
        for answer in ["a", "b"] {
            let turn = committed(&mut conv, answer);
            state.handle_session_event(SessionEvent::TurnCommitted {
                index: conv.turns().len() - 1,
                turn,
            });
        }
        state.show_notice("note");

        conv.toggle_expanded(0).unwrap();
        state.sync_turns(&conv);
        assert!(matches!(&state.entries[0], Entry::Turn(t) if !t.expanded));
        assert!(matches!(&state.entries[1], Entry::Turn(t) if t.expanded));

        conv.clear().unwrap();
        state.sync_turns(&conv);
        assert_eq!(state.entries.len(), 1);
        assert!(matches!(&state.entries[0], Entry::Notice { .. }));
    }

    #[tokio::test]
    async fn test_submit_routes_commands_and_messages() {
        let (mut state, mut rx) = state();

        state.input.set_content("/help");
        assert!(state.handle_action(Action::Submit, 80).await);
        assert!(matches!(rx.recv().await, Some(UiMessage::Command(c)) if c == "/help"));

        state.input.set_content("  who is richest?  ");
        state.handle_action(Action::Submit, 80).await;
        assert!(matches!(rx.recv().await, Some(UiMessage::Submit(c)) if c == "who is richest?"));

        state.handle_action(Action::ToggleTrace, 80).await;
        assert!(matches!(rx.recv().await, Some(UiMessage::ToggleLatest)));

        assert!(!state.handle_action(Action::Interrupt, 80).await);
        assert!(matches!(rx.recv().await, Some(UiMessage::Quit)));
    }
}
