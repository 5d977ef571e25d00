//! ponder-tui: terminal presentation for reasoning-agent chats
//!
//! Widgets render snapshots of [`ponder_core::Turn`]s; they never touch
//! conversation state.

pub mod input;
pub mod theme;
pub mod widgets;

pub use theme::Theme;
