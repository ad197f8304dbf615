//! Classification of inbound stream payloads.
//!
//! Pure function from payload text to frame, unit-testable independent of
//! the transport. One malformed payload is never fatal to the stream: it
//! classifies to `None`, gets logged and dropped.

use crate::protocol::{AgentThought, ProtocolPatch, ProtocolStatus};
use serde_json::Value;

/// The frame kinds the backend emits on a protocol stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Full-field patch: status, iteration, metrics, conditional draft.
    ProtocolUpdate(ProtocolPatch),
    /// Append-only draft text delta.
    DraftDelta { chunk: String },
    /// A discrete agent thought for the live-side reconciler buffer.
    Thought(AgentThought),
    /// The workflow run has finished emitting; refetch then close.
    Complete { status: Option<ProtocolStatus> },
    /// The server closed its streaming window deliberately. Handled like
    /// `Complete` rather than burning reconnect attempts.
    Timeout,
}

/// Classify one SSE `data:` payload. Returns `None` for malformed JSON or
/// shapes that match no known frame.
pub fn parse_frame(payload: &str) -> Option<Frame> {
    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(error) => {
            tracing::debug!(%error, "Dropping unparseable stream payload");
            return None;
        }
    };

    match value.get("type").and_then(Value::as_str) {
        Some("protocol_update") => match serde_json::from_value(value) {
            Ok(patch) => Some(Frame::ProtocolUpdate(patch)),
            Err(error) => {
                tracing::debug!(%error, "Dropping malformed protocol_update frame");
                None
            }
        },
        Some("protocol_update_incremental") => {
            let chunk = value.get("chunk").and_then(Value::as_str)?.to_string();
            Some(Frame::DraftDelta { chunk })
        }
        Some("complete") => Some(Frame::Complete {
            status: value
                .get("status")
                .cloned()
                .and_then(|status| serde_json::from_value(status).ok()),
        }),
        Some("timeout") => Some(Frame::Timeout),
        _ => {
            // Bare thought objects carry agentRole + content and their own
            // "type" (thought/action/feedback/revision). The named
            // `complete` event body has only a status field.
            if value.get("agentRole").is_some() && value.get("content").is_some() {
                return match serde_json::from_value(value) {
                    Ok(thought) => Some(Frame::Thought(thought)),
                    Err(error) => {
                        tracing::debug!(%error, "Dropping malformed thought frame");
                        None
                    }
                };
            }
            if let Some(status) = value.get("status") {
                if value.as_object().is_some_and(|obj| obj.len() == 1) {
                    return Some(Frame::Complete {
                        status: serde_json::from_value(status.clone()).ok(),
                    });
                }
            }
            tracing::debug!("Dropping unrecognized stream payload");
            None
        }
    }
}
