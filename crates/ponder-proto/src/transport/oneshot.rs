//! Non-streaming fallback: `POST /api/chat` returning `{response}`

use async_stream::stream;
use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::{
    CHAT_PATH, ChatRequest, Endpoint, Transport, TransportKind, failure_event, probe_health,
    send_cancellable, status_error,
};
use crate::{
    error::{Error, Result},
    event::{EventStream, StreamEvent},
};

#[derive(Debug, Deserialize)]
struct ChatResponse {
    response: String,
}

/// Sends the whole exchange as one request; the answer arrives as a single
/// `FinalAnswer` with no intermediate steps
pub struct OneShotTransport {
    client: reqwest::Client,
    endpoint: Endpoint,
}

impl OneShotTransport {
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
impl Transport for OneShotTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Oneshot
    }

    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn open(&self, message: &str, cancel: CancellationToken) -> EventStream {
        let request = self
            .client
            .post(self.endpoint.url(CHAT_PATH))
            .json(&ChatRequest { message });
        let endpoint = self.endpoint.clone();

        Box::pin(stream! {
            let Some(sent) = send_cancellable(request, &cancel).await else {
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

            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                body = response.text() => Some(body),
            };

            match body {
                None => {}
                Some(Ok(text)) => match serde_json::from_str::<ChatResponse>(&text) {
                    Ok(chat) => yield StreamEvent::final_answer(chat.response),
                    Err(e) => {
                        yield failure_event(
                            Error::UnexpectedResponse(format!("expected {{\"response\": ...}}: {}", e)),
                            &endpoint,
                        );
                    }
                },
                Some(Err(e)) => yield failure_event(Error::from(e), &endpoint),
            }
        })
    }

    async fn check_health(&self) -> Result<()> {
        probe_health(&self.client, &self.endpoint).await
    }
}
