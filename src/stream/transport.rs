//! Transport seam between the controller and the wire.
//!
//! The controller only sees a stream of classified frames; tests inject
//! scripted transports, production uses the reqwest SSE implementation.

use crate::error::StreamError;
use crate::stream::frame::{parse_frame, Frame};
use crate::stream::sse::SseDecoder;
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use std::pin::Pin;

pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, StreamError>> + Send + 'static>>;

#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Open one push connection. Resolves once the server has accepted the
    /// connection; frames follow on the returned stream.
    async fn open(&self, url: &str) -> Result<FrameStream, StreamError>;
}

/// Server-Sent Events over the shared reqwest client.
pub struct SseTransport {
    client: reqwest::Client,
}

impl SseTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StreamTransport for SseTransport {
    async fn open(&self, url: &str) -> Result<FrameStream, StreamError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "text/event-stream")
            .send()
            .await
            .map_err(|e| StreamError::Connect {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(StreamError::Connect {
                url: url.to_string(),
                message: format!("server returned {}", response.status()),
            });
        }

        let mut bytes = response.bytes_stream();
        let stream = async_stream::stream! {
            let mut decoder = SseDecoder::new();
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => {
                        for payload in decoder.push(&chunk) {
                            // Malformed payloads are dropped inside
                            // parse_frame; one bad frame never kills the
                            // connection.
                            if let Some(frame) = parse_frame(&payload) {
                                yield Ok(frame);
                            }
                        }
                    }
                    Err(error) => {
                        yield Err(StreamError::Closed);
                        tracing::warn!(%error, "SSE byte stream failed");
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
