//! ponder-proto: wire protocol and transports for a ReAct agent backend
//!
//! The backend streams JSON frames describing its reasoning while it answers a
//! user message. This crate decodes those frames into [`StreamEvent`]s and
//! offers three interchangeable [`Transport`]s for receiving them.

pub mod error;
pub mod event;
pub mod parser;
pub mod transport;

pub use error::{Error, Result};
pub use event::{EventStream, StreamEvent};
pub use parser::{LineBuffer, parse_frame};
pub use transport::{
    DEFAULT_BASE_URL, Endpoint, OneShotTransport, PushChannelTransport, StreamingBodyTransport,
    Transport, TransportKind, connect,
};
