//! Error types for ponder-core

use thiserror::Error;

/// Result type alias using ponder-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a conversation
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the protocol layer
    #[error(transparent)]
    Proto(#[from] ponder_proto::Error),

    /// A turn is already streaming
    #[error("a turn is already in flight; wait for it to finish or cancel it")]
    Busy,

    /// Turn position out of range
    #[error("no turn #{0}")]
    NoSuchTurn(usize),

    /// A generic session error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the caller can simply retry once the session is idle
    pub fn is_busy(&self) -> bool {
        matches!(self, Error::Busy)
    }
}
