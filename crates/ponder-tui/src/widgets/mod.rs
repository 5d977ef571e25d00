//! Widgets for the chat transcript and prompt

pub mod input_box;
pub mod markdown;
pub mod spinner;
pub mod turn_list;

pub use input_box::InputBox;
pub use spinner::Spinner;
pub use turn_list::{Entry, TurnList};
