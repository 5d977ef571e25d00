//! Input handling

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};

/// Processed input action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Regular character input
    Char(char),
    /// Enter/submit
    Submit,
    Backspace,
    Delete,
    Left,
    Right,
    /// Previous entry in input history
    Up,
    /// Next entry in input history
    Down,
    Home,
    End,
    /// Scroll the transcript
    PageUp,
    PageDown,
    /// Esc: cancel the streaming turn
    Escape,
    /// Ctrl+C: cancel, or quit when idle
    Interrupt,
    /// Ctrl+D on an empty line
    Eof,
    /// Ctrl+L: clear the transcript
    Clear,
    /// Ctrl+U
    ClearLine,
    /// Ctrl+W
    DeleteWord,
    /// Ctrl+E: show or hide the reasoning of the latest turn
    ToggleTrace,
    /// Ctrl+O: show or hide the reasoning of every turn
    ToggleAllTraces,
    /// Bracketed paste
    Paste(String),
    Quit,
    Unknown,
}

/// Convert a crossterm key event to an action
pub fn key_to_action(event: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = event;

    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Action::Interrupt,
            KeyCode::Char('d') => Action::Eof,
            KeyCode::Char('l') => Action::Clear,
            KeyCode::Char('u') => Action::ClearLine,
            KeyCode::Char('w') => Action::DeleteWord,
            KeyCode::Char('e') => Action::ToggleTrace,
            KeyCode::Char('o') => Action::ToggleAllTraces,
            KeyCode::Char('q') => Action::Quit,
            KeyCode::Char('a') => Action::Home,
            _ => Action::Unknown,
        };
    }

    if modifiers.contains(KeyModifiers::ALT) {
        return Action::Unknown;
    }

    match code {
        KeyCode::Char(c) => Action::Char(c),
        KeyCode::Enter => Action::Submit,
        KeyCode::Backspace => Action::Backspace,
        KeyCode::Delete => Action::Delete,
        KeyCode::Left => Action::Left,
        KeyCode::Right => Action::Right,
        KeyCode::Up => Action::Up,
        KeyCode::Down => Action::Down,
        KeyCode::Home => Action::Home,
        KeyCode::End => Action::End,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::Esc => Action::Escape,
        _ => Action::Unknown,
    }
}

/// Convert a crossterm event to an action
pub fn event_to_action(event: Event) -> Option<Action> {
    match event {
        Event::Key(key_event) => Some(key_to_action(key_event)),
        Event::Paste(text) => Some(Action::Paste(text)),
        _ => None,
    }
}
