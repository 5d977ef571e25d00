//! Single-line message input with submission history

use crate::input::Action;
use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthChar;

/// Most recent submissions kept for Up/Down recall
const MAX_HISTORY: usize = 100;

/// Single-line text input widget
#[derive(Debug, Default)]
pub struct InputBox {
    content: String,
    /// Cursor position (character index, not byte index)
    cursor: usize,
    /// Horizontal scroll offset (in display width)
    scroll: usize,
    placeholder: String,
    focused: bool,
    history: Vec<String>,
    /// Position while browsing history; `None` when editing a fresh line
    history_pos: Option<usize>,
    /// Line being edited before browsing started
    draft: String,
}

impl InputBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn set_placeholder(&mut self, placeholder: impl Into<String>) {
        self.placeholder = placeholder.into();
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.cursor = self.content.chars().count();
        self.scroll = 0;
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
        self.scroll = 0;
    }

    /// Take the trimmed line for sending and remember it in history.
    ///
    /// Returns `None` and leaves the input untouched when it is blank.
    pub fn submit(&mut self) -> Option<String> {
        let text = self.content.trim().to_string();
        if text.is_empty() {
            return None;
        }
        if self.history.last() != Some(&text) {
            if self.history.len() >= MAX_HISTORY {
                self.history.remove(0);
            }
            self.history.push(text.clone());
        }
        self.history_pos = None;
        self.draft.clear();
        self.clear();
        Some(text)
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    fn cursor_display_width(&self) -> usize {
        self.content
            .chars()
            .take(self.cursor)
            .map(|c| c.width().unwrap_or(0))
            .sum()
    }

    fn remove_chars(&mut self, from: usize, to: usize) {
        let start = self.byte_offset(from);
        let end = self.byte_offset(to);
        self.content.drain(start..end);
    }

    fn history_prev(&mut self) -> bool {
        if self.history.is_empty() {
            return false;
        }
        let pos = match self.history_pos {
            None => {
                self.draft = self.content.clone();
                self.history.len() - 1
            }
            Some(0) => return false,
            Some(pos) => pos - 1,
        };
        self.history_pos = Some(pos);
        let entry = self.history[pos].clone();
        self.set_content(entry);
        true
    }

    fn history_next(&mut self) -> bool {
        let Some(pos) = self.history_pos else {
            return false;
        };
        if pos + 1 < self.history.len() {
            self.history_pos = Some(pos + 1);
            let entry = self.history[pos + 1].clone();
            self.set_content(entry);
        } else {
            self.history_pos = None;
            let draft = std::mem::take(&mut self.draft);
            self.set_content(draft);
        }
        true
    }

    /// Handle an input action; returns whether anything changed
    pub fn handle_action(&mut self, action: &Action, width: u16) -> bool {
        let char_count = self.content.chars().count();

        let changed = match action {
            Action::Char(c) => {
                self.insert_char(*c);
                true
            }
            Action::Backspace if self.cursor > 0 => {
                self.remove_chars(self.cursor - 1, self.cursor);
                self.cursor -= 1;
                true
            }
            Action::Delete if self.cursor < char_count => {
                self.remove_chars(self.cursor, self.cursor + 1);
                true
            }
            Action::Left if self.cursor > 0 => {
                self.cursor -= 1;
                true
            }
            Action::Right if self.cursor < char_count => {
                self.cursor += 1;
                true
            }
            Action::Home => {
                self.cursor = 0;
                true
            }
            Action::End => {
                self.cursor = char_count;
                true
            }
            Action::Up => self.history_prev(),
            Action::Down => self.history_next(),
            Action::ClearLine => {
                self.clear();
                true
            }
            Action::DeleteWord => {
                let chars: Vec<char> = self.content.chars().collect();
                let mut start = self.cursor;
                while start > 0 && chars[start - 1] == ' ' {
                    start -= 1;
                }
                while start > 0 && chars[start - 1] != ' ' {
                    start -= 1;
                }
                self.remove_chars(start, self.cursor);
                self.cursor = start;
                true
            }
            Action::Paste(text) => {
                for c in text.chars() {
                    if c == '\n' || c == '\r' {
                        // Collapse line breaks; the backend takes one line per message
                        if self.cursor > 0 && !self.content.ends_with(' ') {
                            self.insert_char(' ');
                        }
                    } else {
                        self.insert_char(c);
                    }
                }
                true
            }
            _ => false,
        };

        if changed {
            self.update_scroll(width as usize);
        }
        changed
    }

    fn insert_char(&mut self, c: char) {
        let byte_offset = self.byte_offset(self.cursor);
        self.content.insert(byte_offset, c);
        self.cursor += 1;
    }

    fn update_scroll(&mut self, width: usize) {
        // Borders and cursor cell
        let visible_width = width.saturating_sub(4).max(1);
        let cursor_pos = self.cursor_display_width();

        if cursor_pos < self.scroll {
            self.scroll = cursor_pos;
        } else if cursor_pos >= self.scroll + visible_width {
            self.scroll = cursor_pos + 1 - visible_width;
        }
    }

    fn visible_text(&self, visible_width: usize) -> String {
        let mut skipped = 0;
        let mut visible = String::new();
        let mut used = 0;
        for c in self.content.chars() {
            let w = c.width().unwrap_or(0);
            if skipped < self.scroll {
                skipped += w;
                continue;
            }
            if used + w > visible_width {
                break;
            }
            visible.push(c);
            used += w;
        }
        visible
    }

    /// Render the input box with an optional title on its border
    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme, title: Option<&str>) {
        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_style(if self.focused {
                theme.accent_style()
            } else {
                theme.border_style()
            });
        if let Some(title) = title {
            block = block.title(title.to_string());
        }

        let inner = block.inner(area);
        block.render(area, buf);

        let (text, style) = if self.content.is_empty() {
            (self.placeholder.clone(), theme.dim_style())
        } else {
            (self.visible_text(inner.width as usize), theme.base_style())
        };
        Paragraph::new(text).style(style).render(inner, buf);

        if self.focused && inner.width > 0 {
            let cursor_x = self.cursor_display_width().saturating_sub(self.scroll);
            if cursor_x < inner.width as usize {
                if let Some(cell) = buf.cell_mut((inner.x + cursor_x as u16, inner.y)) {
                    cell.set_style(Style::default().bg(theme.question));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> InputBox {
        let mut input = InputBox::new();
        for c in text.chars() {
            input.handle_action(&Action::Char(c), 80);
        }
        input
    }

    #[test]
    fn test_multibyte_editing() {
        let mut input = typed("héllo 世界");
        input.handle_action(&Action::Backspace, 80);
        assert_eq!(input.content(), "héllo 世");
        input.handle_action(&Action::Home, 80);
        input.handle_action(&Action::Right, 80);
        input.handle_action(&Action::Delete, 80);
        assert_eq!(input.content(), "hllo 世");
    }

    #[test]
    fn test_delete_word() {
        let mut input = typed("who is  richest  ");
        input.handle_action(&Action::DeleteWord, 80);
        assert_eq!(input.content(), "who is  ");
    }

    #[test]
    fn test_submit_trims_and_skips_blank() {
        let mut input = typed("   ");
        assert_eq!(input.submit(), None);
        assert_eq!(input.content(), "   ");

        let mut input = typed("  hello ");
        assert_eq!(input.submit().as_deref(), Some("hello"));
        assert!(input.is_empty());
    }

    #[test]
    fn test_history_recall_restores_draft() {
        let mut input = InputBox::new();
        for text in ["first", "second"] {
            input.set_content(text);
            input.submit();
        }
        input.set_content("draft");

        assert!(input.handle_action(&Action::Up, 80));
        assert_eq!(input.content(), "second");
        input.handle_action(&Action::Up, 80);
        assert_eq!(input.content(), "first");
        assert!(!input.handle_action(&Action::Up, 80));

        input.handle_action(&Action::Down, 80);
        assert_eq!(input.content(), "second");
        input.handle_action(&Action::Down, 80);
        assert_eq!(input.content(), "draft");
        assert!(!input.handle_action(&Action::Down, 80));
    }

    #[test]
    fn test_paste_collapses_newlines() {
        let mut input = typed("a");
        input.handle_action(&Action::Paste("b\r\nc".into()), 80);
        assert_eq!(input.content(), "ab c");
    }

    #[test]
    fn test_scroll_follows_cursor() {
        let mut input = InputBox::new();
        for _ in 0..30 {
            input.handle_action(&Action::Char('x'), 14);
        }
        // The last visible cell is reserved for the cursor
        assert_eq!(input.visible_text(10).chars().count(), 9);
        input.handle_action(&Action::Home, 14);
        assert_eq!(input.scroll, 0);
    }
}
