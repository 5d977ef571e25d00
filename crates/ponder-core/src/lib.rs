//! ponder-core: conversation state for reasoning-agent chats
//!
//! This crate folds the backend's stream events into a per-turn reasoning
//! trace and drives one transport stream per user message.

pub mod conversation;
pub mod error;
pub mod events;
pub mod handle;
pub mod session;
pub mod step;
pub mod turn;

pub use conversation::{Conversation, Phase, Transition, reduce};
pub use error::{Error, Result};
pub use events::SessionEvent;
pub use handle::SessionHandle;
pub use session::{ChatSession, SendOutcome};
pub use step::{Step, format_observation};
pub use turn::Turn;
