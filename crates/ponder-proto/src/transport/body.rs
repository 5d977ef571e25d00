//! Chunked-body transport: `POST /api/chat/react-stream`, one JSON frame per line

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::{
    ChatRequest, Endpoint, REACT_STREAM_PATH, Transport, TransportKind, failure_event,
    probe_health, send_cancellable, status_error,
};
use crate::{
    error::{Error, Result},
    event::EventStream,
    parser::{LineBuffer, parse_frame},
};

/// Reads the streaming response body incrementally
pub struct StreamingBodyTransport {
    client: reqwest::Client,
    endpoint: Endpoint,
}

impl StreamingBodyTransport {
    /// Create a transport for the given backend
    pub fn new(endpoint: Endpoint) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    /// Create with a preconfigured HTTP client
    pub fn with_client(client: reqwest::Client, endpoint: Endpoint) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl Transport for StreamingBodyTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Stream
    }

    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn open(&self, message: &str, cancel: CancellationToken) -> EventStream {
        let request = self
            .client
            .post(self.endpoint.url(REACT_STREAM_PATH))
            .json(&ChatRequest { message });
        let endpoint = self.endpoint.clone();

        Box::pin(stream! {
            let Some(sent) = send_cancellable(request, &cancel).await else {
                tracing::debug!("Cancelled before the request was answered");
                return;
            };

            let response = match sent {
                Ok(response) => response,
                Err(e) => {
                    yield failure_event(Error::from(e), &endpoint);
                    return;
                }
            };

            if !response.status().is_success() {
                yield failure_event(status_error(response).await, &endpoint);
                return;
            }

            let mut body = response.bytes_stream();
            let mut lines = LineBuffer::new();

            loop {
                while let Some(line) = lines.next_line() {
                    if cancel.is_cancelled() {
                        return;
                    }
                    if let Some(event) = parse_frame(&line) {
                        let terminal = event.is_terminal();
                        yield event;
                        if terminal {
                            return;
                        }
                    }
                }

                let chunk = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    chunk = body.next() => Some(chunk),
                };

                match chunk {
                    None => {
                        tracing::debug!("Stream cancelled, closing connection");
                        return;
                    }
                    Some(Some(Ok(bytes))) => lines.push(&bytes),
                    Some(Some(Err(e))) => {
                        yield failure_event(Error::from(e), &endpoint);
                        return;
                    }
                    Some(None) => {
                        if let Some(event) = lines.finish().as_deref().and_then(parse_frame) {
                            let terminal = event.is_terminal();
                            yield event;
                            if terminal {
                                return;
                            }
                        }
                        yield failure_event(Error::Truncated, &endpoint);
                        return;
                    }
                }
            }
        })
    }

    async fn check_health(&self) -> Result<()> {
        probe_health(&self.client, &self.endpoint).await
    }
}
