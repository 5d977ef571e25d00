//! Transcript widget: turns with their reasoning traces, plus local notices

use crate::theme::Theme;
use crate::widgets::{markdown::render_markdown, markdown::truncate_to_width, spinner};
use ponder_core::{Step, Turn};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use std::time::Duration;

/// Observation lines shown per step before eliding the rest
const MAX_OBSERVATION_LINES: usize = 12;

/// One item in the transcript
#[derive(Debug, Clone)]
pub enum Entry {
    /// A committed turn
    Turn(Turn),
    /// Local output such as command results; never sent to the backend
    Notice { text: String, is_error: bool },
}

impl Entry {
    pub fn notice(text: impl Into<String>) -> Self {
        Entry::Notice {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Entry::Notice {
            text: text.into(),
            is_error: true,
        }
    }
}

fn wrapped(text: &str, indent: usize, style: Style, width: usize) -> Vec<Line<'static>> {
    let pad = " ".repeat(indent);
    let avail = width.saturating_sub(indent).max(8);
    let mut lines = Vec::new();
    for raw in text.lines() {
        if raw.trim().is_empty() {
            lines.push(Line::from(""));
            continue;
        }
        for piece in textwrap::wrap(raw, avail) {
            lines.push(Line::from(Span::styled(format!("{}{}", pad, piece), style)));
        }
    }
    lines
}

fn labelled(label: &str, text: &str, style: Style, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let mut lines = wrapped(text, 4 + label.len() + 1, style, width);
    let first = format!("    {} ", label);
    match lines.first_mut() {
        Some(line) => {
            // Replace the padding on the first line with the label
            if let Some(span) = line.spans.first_mut() {
                let body = span.content.trim_start().to_string();
                *span = Span::styled(body, style);
            }
            line.spans.insert(0, Span::styled(first, theme.label_style()));
        }
        None => lines.push(Line::from(Span::styled(first, theme.label_style()))),
    }
    lines
}

fn render_step(step: &Step, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    match step {
        Step::Thought { content } => {
            let mut lines = wrapped(content, 4, theme.thought_style(), width);
            if let Some(line) = lines.first_mut() {
                line.spans
                    .insert(0, Span::styled("  💭", theme.thought_style()));
                if let Some(span) = line.spans.get_mut(1) {
                    *span = Span::styled(format!(" {}", span.content.trim_start()), span.style);
                }
            }
            lines
        }
        Step::Action {
            index,
            thought,
            action,
            observation,
        } => {
            let mut lines = vec![Line::from(Span::styled(
                format!("  Step {}", index),
                theme.accent_bold(),
            ))];
            if !thought.is_empty() {
                lines.extend(labelled("Thought:", thought, theme.thought_style(), theme, width));
            }
            if !action.is_empty() {
                lines.extend(labelled("Action:", action, theme.action_style(), theme, width));
            }
            if !observation.is_empty() {
                lines.push(Line::from(Span::styled(
                    "    Observation:".to_string(),
                    theme.label_style(),
                )));
                let total = observation.lines().count();
                for line in observation.lines().take(MAX_OBSERVATION_LINES) {
                    let shown = truncate_to_width(line, width.saturating_sub(6));
                    lines.push(Line::from(Span::styled(
                        format!("      {}", shown),
                        theme.code_style(),
                    )));
                }
                if total > MAX_OBSERVATION_LINES {
                    lines.push(Line::from(Span::styled(
                        format!("      … {} more lines", total - MAX_OBSERVATION_LINES),
                        theme.dim_style(),
                    )));
                }
            }
            lines
        }
    }
}

/// Lines for one turn.
///
/// `number` is the 1-based position in the committed log, `None` while the
/// turn is in flight. `elapsed` drives the spinner of an in-flight turn.
pub fn render_turn(
    turn: &Turn,
    number: Option<usize>,
    theme: &Theme,
    width: usize,
    elapsed: Duration,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let in_flight = !turn.is_committed();

    let mut header = vec![Span::styled("▶ You".to_string(), theme.accent_bold())];
    let mut meta = Vec::new();
    if let Some(n) = number {
        meta.push(format!("#{}", n));
    }
    if let Some(at) = turn.started_at_local() {
        meta.push(at.format("%H:%M:%S").to_string());
    }
    if !meta.is_empty() {
        header.push(Span::styled(format!("  {}", meta.join(" · ")), theme.dim_style()));
    }
    lines.push(Line::from(header));
    lines.extend(wrapped(&turn.user_message, 2, theme.base_style(), width));

    let has_trace = turn.plan.is_some() || !turn.steps.is_empty();
    if has_trace && (turn.expanded || in_flight) {
        if let Some(plan) = &turn.plan {
            lines.push(Line::from(Span::styled(
                "  Plan".to_string(),
                theme.warning_style().add_modifier(Modifier::BOLD),
            )));
            lines.extend(wrapped(plan, 4, theme.dim_style(), width));
        }
        for step in &turn.steps {
            lines.extend(render_step(step, theme, width));
        }
    } else if has_trace {
        let hint = match number {
            Some(n) => format!("  ▸ {} steps hidden · /toggle {}", turn.steps.len(), n),
            None => format!("  ▸ {} steps hidden", turn.steps.len()),
        };
        lines.push(Line::from(Span::styled(hint, theme.dim_style())));
    }

    if in_flight {
        let status = match turn.action_count() {
            0 => "thinking…".to_string(),
            1 => "thinking… (1 step)".to_string(),
            n => format!("thinking… ({} steps)", n),
        };
        lines.push(Line::from(Span::styled(
            format!("  {} {}", spinner::frame_at(elapsed), status),
            theme.warning_style(),
        )));
    } else if let Some(text) = &turn.final_text {
        let (label, style) = if turn.is_error {
            ("◀ Error", theme.error_style().add_modifier(Modifier::BOLD))
        } else {
            ("◀ Agent", theme.success_style().add_modifier(Modifier::BOLD))
        };
        lines.push(Line::from(Span::styled(label.to_string(), style)));
        if turn.is_error {
            lines.extend(wrapped(text, 2, theme.error_style(), width));
        } else {
            for line in render_markdown(text, theme, width.saturating_sub(2)) {
                let mut spans = vec![Span::raw("  ")];
                spans.extend(line.spans);
                lines.push(Line::from(spans));
            }
        }
    }

    lines.push(Line::from(""));
    lines
}

fn render_notice(text: &str, is_error: bool, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let style = if is_error {
        theme.error_style()
    } else {
        theme.dim_style()
    };
    let mut lines = vec![Line::from(Span::styled("● ".to_string(), style))];
    lines.extend(wrapped(text, 2, style, width));
    lines.push(Line::from(""));
    lines
}

/// All transcript lines, committed entries first and the in-flight turn last
pub fn transcript_lines(
    entries: &[Entry],
    in_flight: Option<&Turn>,
    theme: &Theme,
    width: usize,
    elapsed: Duration,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut number = 0;
    for entry in entries {
        match entry {
            Entry::Turn(turn) => {
                number += 1;
                lines.extend(render_turn(turn, Some(number), theme, width, elapsed));
            }
            Entry::Notice { text, is_error } => {
                lines.extend(render_notice(text, *is_error, theme, width));
            }
        }
    }
    if let Some(turn) = in_flight {
        lines.extend(render_turn(turn, None, theme, width, elapsed));
    }
    lines
}

/// Total height of the transcript at a given width
pub fn transcript_height(entries: &[Entry], in_flight: Option<&Turn>, width: usize) -> usize {
    transcript_lines(entries, in_flight, &Theme::dark(), width, Duration::ZERO).len()
}

/// Widget for displaying the transcript
pub struct TurnList<'a> {
    entries: &'a [Entry],
    in_flight: Option<&'a Turn>,
    theme: &'a Theme,
    scroll: usize,
    elapsed: Duration,
}

impl<'a> TurnList<'a> {
    pub fn new(entries: &'a [Entry], theme: &'a Theme) -> Self {
        Self {
            entries,
            in_flight: None,
            theme,
            scroll: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Show a streaming turn below the committed entries
    pub fn in_flight(mut self, turn: Option<&'a Turn>, elapsed: Duration) -> Self {
        self.in_flight = turn;
        self.elapsed = elapsed;
        self
    }

    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }
}

impl Widget for TurnList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let visible: Vec<Line> = transcript_lines(
            self.entries,
            self.in_flight,
            self.theme,
            area.width as usize,
            self.elapsed,
        )
        .into_iter()
        .skip(self.scroll)
        .take(area.height as usize)
        .collect();

        Paragraph::new(visible).render(area, buf);
    }
}
