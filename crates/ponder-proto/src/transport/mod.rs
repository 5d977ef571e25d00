//! Transport adapters
//!
//! A [`Transport`] opens one connection per user message and yields the
//! backend's events in emission order. Every failure below the event layer is
//! folded into a single synthesized [`StreamEvent::Error`] so callers only
//! ever deal with events.

pub mod body;
pub mod oneshot;
pub mod push;

use std::{fmt, str::FromStr, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Error, Result},
    event::{EventStream, StreamEvent},
};

pub use body::StreamingBodyTransport;
pub use oneshot::OneShotTransport;
pub use push::PushChannelTransport;

/// Backend used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:5001";

/// Streaming route, shared by the body and push transports
pub(crate) const REACT_STREAM_PATH: &str = "/api/chat/react-stream";

/// Non-streaming route
pub(crate) const CHAT_PATH: &str = "/api/chat";

/// Request body for the POST routes
#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub message: &'a str,
}

/// Location of the agent backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base_url: String,
}

impl Endpoint {
    /// Validate and normalize a base URL
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let raw = base_url.as_ref().trim();
        let parsed = reqwest::Url::parse(raw)
            .map_err(|e| Error::InvalidConfig(format!("invalid backend URL '{}': {}", raw, e)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidConfig(format!(
                "backend URL must be http or https, got '{}'",
                parsed.scheme()
            )));
        }

        Ok(Self {
            base_url: raw.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL without a trailing slash
    pub fn base(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a route path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url)
    }
}

/// Which transport strategy to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Newline-delimited JSON response body
    #[default]
    Stream,
    /// Server-sent events channel
    Push,
    /// Single JSON response, no intermediate steps
    Oneshot,
}

impl TransportKind {
    /// Config/CLI name
    pub fn name(&self) -> &'static str {
        match self {
            TransportKind::Stream => "stream",
            TransportKind::Push => "push",
            TransportKind::Oneshot => "oneshot",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "stream" | "ndjson" | "body" => Ok(TransportKind::Stream),
            "push" | "sse" => Ok(TransportKind::Push),
            "oneshot" | "fallback" | "plain" => Ok(TransportKind::Oneshot),
            other => Err(Error::InvalidConfig(format!(
                "unknown transport '{}' (expected stream, push or oneshot)",
                other
            ))),
        }
    }
}

/// Connection to an agent backend
#[async_trait]
pub trait Transport: Send + Sync {
    /// Strategy implemented by this transport
    fn kind(&self) -> TransportKind;

    /// Backend this transport talks to
    fn endpoint(&self) -> &Endpoint;

    /// Open a stream of events for one user message.
    ///
    /// The stream is lazy: nothing is sent until it is first polled. It ends
    /// right after a terminal event, after a synthesized error, or as soon as
    /// `cancel` fires.
    fn open(&self, message: &str, cancel: CancellationToken) -> EventStream;

    /// Probe the backend's root route
    async fn check_health(&self) -> Result<()>;
}

/// Build the transport for a strategy
pub fn connect(kind: TransportKind, endpoint: Endpoint) -> Arc<dyn Transport> {
    match kind {
        TransportKind::Stream => Arc::new(StreamingBodyTransport::new(endpoint)),
        TransportKind::Push => Arc::new(PushChannelTransport::new(endpoint)),
        TransportKind::Oneshot => Arc::new(OneShotTransport::new(endpoint)),
    }
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    #[serde(default)]
    status: Option<String>,
}

/// `GET /` on the backend; any 2xx counts unless the body reports a non-ok status
pub(crate) async fn probe_health(client: &reqwest::Client, endpoint: &Endpoint) -> Result<()> {
    let response = client.get(endpoint.url("/")).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::status(status.as_u16(), body));
    }

    let body = response.text().await?;
    if let Ok(HealthResponse {
        status: Some(reported),
    }) = serde_json::from_str::<HealthResponse>(&body)
    {
        if !reported.eq_ignore_ascii_case("ok") {
            return Err(Error::UnexpectedResponse(format!(
                "backend reported status '{}'",
                reported
            )));
        }
    }

    tracing::debug!("Backend at {} is healthy", endpoint);
    Ok(())
}

/// Send a request unless `cancel` fires first; `None` means cancelled
pub(crate) async fn send_cancellable(
    request: reqwest::RequestBuilder,
    cancel: &CancellationToken,
) -> Option<reqwest::Result<reqwest::Response>> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        result = request.send() => Some(result),
    }
}

/// Turn a transport failure into the event that ends the stream
pub(crate) fn failure_event(error: Error, endpoint: &Endpoint) -> StreamEvent {
    tracing::warn!("Transport failure talking to {}: {}", endpoint, error);
    StreamEvent::error(error.remediation(endpoint.base()))
}

/// Read an unsuccessful response into a status error
pub(crate) async fn status_error(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Error::status(status, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[test]
    fn test_endpoint_normalizes_trailing_slash() {
        let endpoint = Endpoint::new("http://localhost:5001/").unwrap();
        assert_eq!(endpoint.base(), "http://localhost:5001");
        assert_eq!(
            endpoint.url(REACT_STREAM_PATH),
            "http://localhost:5001/api/chat/react-stream"
        );
    }

    #[test]
    fn test_endpoint_rejects_bad_urls() {
        assert!(matches!(
            Endpoint::new("not a url"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            Endpoint::new("ftp://example.com"),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_transport_kind_parsing() {
        assert_eq!("stream".parse::<TransportKind>().unwrap(), TransportKind::Stream);
        assert_eq!("SSE".parse::<TransportKind>().unwrap(), TransportKind::Push);
        assert_eq!(
            "fallback".parse::<TransportKind>().unwrap(),
            TransportKind::Oneshot
        );
        assert!("carrier-pigeon".parse::<TransportKind>().is_err());
        assert_eq!(TransportKind::Push.to_string(), "push");
    }

    #[test]
    fn test_connect_selects_kind() {
        for kind in [
            TransportKind::Stream,
            TransportKind::Push,
            TransportKind::Oneshot,
        ] {
            let transport = connect(kind, Endpoint::default());
            assert_eq!(transport.kind(), kind);
            assert_eq!(transport.endpoint().base(), DEFAULT_BASE_URL);
        }
    }

    #[tokio::test]
    async fn test_health_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "ok", "message": "running"})),
            )
            .mount(&server)
            .await;

        let transport = connect(TransportKind::Stream, Endpoint::new(server.uri()).unwrap());
        transport.check_health().await.unwrap();
    }

    #[tokio::test]
    async fn test_health_reports_bad_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(503).set_body_string("starting"))
            .mount(&server)
            .await;

        let transport = connect(TransportKind::Push, Endpoint::new(server.uri()).unwrap());
        let err = transport.check_health().await.unwrap_err();
        assert!(matches!(err, Error::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_health_unreachable() {
        let transport = connect(
            TransportKind::Oneshot,
            Endpoint::new("http://127.0.0.1:1").unwrap(),
        );
        let err = transport.check_health().await.unwrap_err();
        assert!(err.is_unreachable());
    }
}
