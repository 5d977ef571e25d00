//! Markdown rendering for final answers

use crate::theme::Theme;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Truncate to a display width, marking the cut with an ellipsis
pub fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// Accumulates styled words into lines no wider than `width`
struct LineWriter<'t> {
    theme: &'t Theme,
    width: usize,
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    used: usize,
    /// Prefix repeated on continuation lines (list indentation)
    hang: String,
}

impl<'t> LineWriter<'t> {
    fn new(theme: &'t Theme, width: usize) -> Self {
        Self {
            theme,
            width: width.max(8),
            lines: Vec::new(),
            spans: Vec::new(),
            used: 0,
            hang: String::new(),
        }
    }

    fn flush(&mut self) {
        if !self.spans.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.spans)));
        }
        self.used = 0;
    }

    fn blank(&mut self) {
        self.flush();
        if self.lines.last().is_some_and(|l| l.width() > 0) {
            self.lines.push(Line::from(""));
        }
    }

    fn push_raw(&mut self, text: String, style: Style) {
        self.used += text.width();
        self.spans.push(Span::styled(text, style));
    }

    /// Add flowing text, breaking between words
    fn push_text(&mut self, text: &str, style: Style) {
        for (i, word) in text.split(' ').enumerate() {
            let needs_space = i > 0;
            let word_width = word.width() + usize::from(needs_space);
            if self.used > 0 && self.used + word_width > self.width {
                self.flush();
                if !self.hang.is_empty() {
                    let hang = self.hang.clone();
                    self.push_raw(hang, Style::default());
                }
                if !word.is_empty() {
                    self.push_raw(word.to_string(), style);
                }
            } else if needs_space {
                self.push_raw(format!(" {}", word), style);
            } else if !word.is_empty() {
                self.push_raw(word.to_string(), style);
            }
        }
    }

    fn push_code_block(&mut self, code: &str) {
        self.flush();
        let style = self.theme.code_style().add_modifier(Modifier::DIM);
        for line in code.lines() {
            let shown = truncate_to_width(line, self.width.saturating_sub(2));
            self.lines
                .push(Line::from(Span::styled(format!("  {}", shown), style)));
        }
        self.blank();
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(|l| l.width() == 0) {
            self.lines.pop();
        }
        self.lines
    }
}

/// Convert markdown text to styled lines wrapped to `width`
pub fn render_markdown(text: &str, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let mut out = LineWriter::new(theme, width);
    let mut styles = vec![theme.base_style()];
    let mut code_block: Option<String> = None;
    let mut list_depth: usize = 0;

    for event in Parser::new(text) {
        let current = styles.last().copied().unwrap_or_default();
        match event {
            Event::Start(tag) => match tag {
                Tag::Heading { level, .. } => {
                    out.blank();
                    let style = match level {
                        HeadingLevel::H1 => theme
                            .accent_style()
                            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                        HeadingLevel::H2 => theme.accent_bold(),
                        _ => theme.accent_style(),
                    };
                    styles.push(style);
                }
                Tag::Paragraph => out.flush(),
                Tag::CodeBlock(_) => code_block = Some(String::new()),
                Tag::List(_) => {
                    out.flush();
                    list_depth += 1;
                }
                Tag::Item => {
                    out.flush();
                    let indent = "  ".repeat(list_depth.saturating_sub(1));
                    out.hang = format!("{}  ", indent);
                    out.push_raw(format!("{}• ", indent), theme.dim_style());
                }
                Tag::Emphasis => styles.push(current.add_modifier(Modifier::ITALIC)),
                Tag::Strong => styles.push(current.add_modifier(Modifier::BOLD)),
                Tag::Strikethrough => styles.push(current.add_modifier(Modifier::CROSSED_OUT)),
                Tag::Link { .. } => styles.push(
                    Style::default()
                        .fg(theme.link)
                        .add_modifier(Modifier::UNDERLINED),
                ),
                _ => {}
            },
            Event::End(tag_end) => match tag_end {
                TagEnd::Heading(_) => {
                    styles.pop();
                    out.flush();
                }
                TagEnd::Paragraph => {
                    if list_depth == 0 {
                        out.blank();
                    } else {
                        out.flush();
                    }
                }
                TagEnd::CodeBlock => {
                    if let Some(code) = code_block.take() {
                        out.push_code_block(&code);
                    }
                }
                TagEnd::List(_) => {
                    list_depth = list_depth.saturating_sub(1);
                    if list_depth == 0 {
                        out.hang.clear();
                        out.blank();
                    }
                }
                TagEnd::Item => out.flush(),
                TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                    if styles.len() > 1 {
                        styles.pop();
                    }
                }
                _ => {}
            },
            Event::Text(text) => match code_block.as_mut() {
                Some(code) => code.push_str(&text),
                None => out.push_text(&text, current),
            },
            Event::Code(code) => {
                out.push_text(&code, theme.code_style().add_modifier(Modifier::BOLD));
            }
            Event::SoftBreak => out.push_text(" ", current),
            Event::HardBreak => out.flush(),
            Event::Rule => {
                out.flush();
                let rule = "─".repeat(out.width.min(40));
                out.lines
                    .push(Line::from(Span::styled(rule, theme.dim_style())));
            }
            _ => {}
        }
    }

    out.finish()
}
