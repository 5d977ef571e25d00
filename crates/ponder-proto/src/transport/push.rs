//! Server-push transport: `GET /api/chat/react-stream?message=...` as server-sent events

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource, retry::Never};
use tokio_util::sync::CancellationToken;

use super::{
    Endpoint, REACT_STREAM_PATH, Transport, TransportKind, failure_event, probe_health,
    status_error,
};
use crate::{
    error::{Error, Result},
    event::EventStream,
    parser::parse_frame,
};

/// Consumes a server-sent events channel, one frame per pushed message
pub struct PushChannelTransport {
    client: reqwest::Client,
    endpoint: Endpoint,
}

impl PushChannelTransport {
    /// Create a transport for the given backend
    pub fn new(endpoint: Endpoint) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    /// Create with a preconfigured HTTP client
    pub fn with_client(client: reqwest::Client, endpoint: Endpoint) -> Self {
        Self { client, endpoint }
    }

    fn channel_url(&self, message: &str) -> String {
        format!(
            "{}?message={}",
            self.endpoint.url(REACT_STREAM_PATH),
            urlencoding::encode(message)
        )
    }
}

#[async_trait]
impl Transport for PushChannelTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Push
    }

    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn open(&self, message: &str, cancel: CancellationToken) -> EventStream {
        let request = self.client.get(self.channel_url(message));
        let endpoint = self.endpoint.clone();

        Box::pin(stream! {
            let mut event_source = match EventSource::new(request) {
                Ok(source) => source,
                Err(e) => {
                    yield failure_event(
                        Error::Sse(format!("Failed to create event source: {}", e)),
                        &endpoint,
                    );
                    return;
                }
            };
            // A reconnect would replay the whole turn
            event_source.set_retry_policy(Box::new(Never));

            loop {
                if cancel.is_cancelled() {
                    event_source.close();
                    return;
                }

                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    next = event_source.next() => Some(next),
                };

                match next {
                    None => {
                        tracing::debug!("Push channel cancelled");
                        event_source.close();
                        return;
                    }
                    Some(None) | Some(Some(Err(reqwest_eventsource::Error::StreamEnded))) => {
                        yield failure_event(Error::Truncated, &endpoint);
                        return;
                    }
                    Some(Some(Ok(Event::Open))) => {
                        tracing::debug!("Push channel open");
                    }
                    Some(Some(Ok(Event::Message(msg)))) => {
                        if let Some(event) = parse_frame(&msg.data) {
                            let terminal = event.is_terminal();
                            yield event;
                            if terminal {
                                event_source.close();
                                return;
                            }
                        }
                    }
                    Some(Some(Err(reqwest_eventsource::Error::InvalidStatusCode(_, response)))) => {
                        event_source.close();
                        yield failure_event(status_error(response).await, &endpoint);
                        return;
                    }
                    Some(Some(Err(reqwest_eventsource::Error::Transport(e)))) => {
                        event_source.close();
                        yield failure_event(Error::from(e), &endpoint);
                        return;
                    }
                    Some(Some(Err(e))) => {
                        event_source.close();
                        yield failure_event(Error::Sse(e.to_string()), &endpoint);
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
