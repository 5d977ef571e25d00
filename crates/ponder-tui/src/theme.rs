//! Transcript palette

use ratatui::style::{Color, Modifier, Style};

/// Colors keyed by what they mark in a turn
#[derive(Debug, Clone)]
pub struct Theme {
    /// The user's question, prompts and the input cursor
    pub question: Color,
    /// Plans and in-flight indicators
    pub plan: Color,
    pub thought: Color,
    /// Tool invocations
    pub action: Color,
    /// Observations and preformatted text
    pub observation: Color,
    pub answer: Color,
    pub failure: Color,
    /// Secondary text, labels and borders
    pub muted: Color,
    pub link: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

fn fg(color: Color) -> Style {
    Style::default().fg(color)
}

impl Theme {
    /// Palette for dark terminals
    pub fn dark() -> Self {
        Self {
            question: Color::Cyan,
            plan: Color::Yellow,
            thought: Color::Gray,
            action: Color::Magenta,
            observation: Color::LightBlue,
            answer: Color::Green,
            failure: Color::Red,
            muted: Color::DarkGray,
            link: Color::Blue,
        }
    }

    /// Answer body text
    pub fn base_style(&self) -> Style {
        Style::default()
    }

    pub fn dim_style(&self) -> Style {
        fg(self.muted)
    }

    pub fn border_style(&self) -> Style {
        fg(self.muted)
    }

    pub fn accent_style(&self) -> Style {
        fg(self.question)
    }

    pub fn accent_bold(&self) -> Style {
        self.accent_style().add_modifier(Modifier::BOLD)
    }

    pub fn error_style(&self) -> Style {
        fg(self.failure)
    }

    pub fn success_style(&self) -> Style {
        fg(self.answer)
    }

    pub fn warning_style(&self) -> Style {
        fg(self.plan)
    }

    pub fn code_style(&self) -> Style {
        fg(self.observation)
    }

    /// Italic reasoning text
    pub fn thought_style(&self) -> Style {
        fg(self.thought).add_modifier(Modifier::ITALIC)
    }

    pub fn action_style(&self) -> Style {
        fg(self.action).add_modifier(Modifier::BOLD)
    }

    /// Labels such as "Action:" inside a step
    pub fn label_style(&self) -> Style {
        self.dim_style().add_modifier(Modifier::BOLD)
    }
}
