//! Error types for ponder-proto

use thiserror::Error;

/// Result type alias using ponder-proto Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the agent backend
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Server-sent events error
    #[error("SSE error: {0}")]
    Sse(String),

    /// Stream ended before a terminal event arrived
    #[error("stream ended before the agent finished")]
    Truncated,

    /// Unexpected response format
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a status error from a code and response body
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Whether the backend could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_connect() || e.is_timeout(),
            Error::Sse(msg) => {
                let msg = msg.to_lowercase();
                msg.contains("connect") || msg.contains("refused")
            }
            _ => false,
        }
    }

    /// User-facing message with a remediation hint for the given backend.
    ///
    /// This is the text carried by the synthesized `Error` event when a
    /// transport fails.
    pub fn remediation(&self, base_url: &str) -> String {
        let hint = match self {
            Error::Status { status, .. } if *status == 404 => format!(
                "Confirm the backend at {} exposes the chat endpoints.",
                base_url
            ),
            Error::Status { status, .. } if *status >= 500 => format!(
                "The backend at {} failed; check its logs.",
                base_url
            ),
            Error::InvalidConfig(_) => "Check the configured backend URL.".to_string(),
            _ => format!(
                "Confirm the backend is running and reachable at {}.",
                base_url
            ),
        };
        format!("{}\n{}", self, hint)
    }
}
