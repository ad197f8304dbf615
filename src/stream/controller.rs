//! Owns the single push connection for one protocol and converts inbound
//! frames into store mutations.
//!
//! Failure policy: never panics or errors across the public boundary.
//! Transient failures become bounded reconnect attempts surfaced as
//! connection-health signals; exhaustion degrades to a slow snapshot poll
//! so the view keeps converging.

use crate::api::ApiClient;
use crate::config::StreamConfig;
use crate::error::ApiError;
use crate::store::{ConnectionHealth, SharedStore};
use crate::stream::frame::Frame;
use crate::stream::transport::StreamTransport;
use futures_util::StreamExt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct StreamController {
    store: SharedStore,
    api: Arc<ApiClient>,
    transport: Arc<dyn StreamTransport>,
    config: StreamConfig,
    task: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FrameOutcome {
    Continue,
    Finished,
}

/// Route one classified frame into the store. Pure dispatch; the store
/// enforces the display-authorization rules.
pub(crate) fn apply_frame(store: &SharedStore, frame: Frame) -> FrameOutcome {
    match frame {
        Frame::ProtocolUpdate(patch) => store.apply_patch(patch),
        Frame::DraftDelta { chunk } => store.append_draft_chunk(&chunk),
        Frame::Thought(thought) => store.record_thought(thought),
        Frame::Complete { status } => {
            tracing::info!(?status, "Workflow run finished emitting");
            return FrameOutcome::Finished;
        }
        Frame::Timeout => {
            tracing::info!("Server closed its streaming window");
            return FrameOutcome::Finished;
        }
    }
    FrameOutcome::Continue
}

impl StreamController {
    pub fn new(
        store: SharedStore,
        api: Arc<ApiClient>,
        transport: Arc<dyn StreamTransport>,
        config: StreamConfig,
    ) -> Self {
        Self {
            store,
            api,
            transport,
            config,
            task: Mutex::new(None),
        }
    }

    /// Open the push connection for this controller's protocol. Idempotent:
    /// calling while connected is a no-op. The live-side thought buffer and
    /// attempt counter reset here and only here, so reconnects never
    /// discard in-flight history.
    pub fn connect(&self) {
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            tracing::debug!("connect() while already connected; ignoring");
            return;
        }

        self.store.clear_live_thoughts();

        let store = self.store.clone();
        let api = Arc::clone(&self.api);
        let transport = Arc::clone(&self.transport);
        let config = self.config;
        *slot = Some(tokio::spawn(async move {
            run_loop(store, api, transport, config).await;
        }));
    }

    /// Close the connection and cancel any pending reconnect or fallback
    /// timer. Safe to call when already disconnected.
    pub fn disconnect(&self) {
        let handle = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            self.store.set_connection_health(ConnectionHealth::Idle);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for StreamController {
    fn drop(&mut self) {
        // No orphaned timers may fire after teardown.
        self.disconnect();
    }
}

async fn run_loop(
    store: SharedStore,
    api: Arc<ApiClient>,
    transport: Arc<dyn StreamTransport>,
    config: StreamConfig,
) {
    let protocol_id = store.protocol_id();
    let url = api.stream_url(&protocol_id);
    let connect_timeout = Duration::from_secs(config.connect_timeout_secs);
    let mut attempt: u32 = 0;

    loop {
        match tokio::time::timeout(connect_timeout, transport.open(&url)).await {
            Ok(Ok(mut frames)) => {
                store.set_connection_health(ConnectionHealth::Live);
                let mut finished = false;
                let mut awaiting_first = true;
                loop {
                    // A connection that opens but never speaks is as dead
                    // as one that never opens; only the first frame gets a
                    // deadline, steady-state gaps are normal.
                    let item = if awaiting_first {
                        match tokio::time::timeout(connect_timeout, frames.next()).await {
                            Ok(item) => item,
                            Err(_elapsed) => {
                                tracing::warn!(
                                    timeout_secs = config.connect_timeout_secs,
                                    protocol_id,
                                    "No frame after opening; dropping connection"
                                );
                                break;
                            }
                        }
                    } else {
                        frames.next().await
                    };
                    awaiting_first = false;
                    match item {
                        Some(Ok(frame)) => {
                            if apply_frame(&store, frame) == FrameOutcome::Finished {
                                finished = true;
                                break;
                            }
                        }
                        Some(Err(error)) => {
                            tracing::warn!(%error, protocol_id, "Stream connection lost");
                            break;
                        }
                        None => break,
                    }
                }
                // A stream-ineligible status means the workflow paused or
                // ended; reconnecting would hold a connection for nothing.
                if finished || !store.status().is_stream_eligible() {
                    finish(&store, &api, &protocol_id).await;
                    return;
                }
            }
            Ok(Err(error)) => {
                tracing::warn!(%error, protocol_id, "Stream connect failed");
            }
            Err(_elapsed) => {
                tracing::warn!(
                    timeout_secs = config.connect_timeout_secs,
                    protocol_id,
                    "Stream connect timed out"
                );
            }
        }

        // Deltas appended since the last full update may be misaligned
        // after a gap; roll back and wait for the next full update.
        store.rollback_unconfirmed_draft();

        attempt += 1;
        if attempt > config.max_reconnect_attempts {
            tracing::warn!(
                attempts = config.max_reconnect_attempts,
                protocol_id,
                "Reconnect attempts exhausted; degrading to snapshot polling"
            );
            fallback_poll(store, api, protocol_id, config).await;
            return;
        }

        store.set_connection_health(ConnectionHealth::Reconnecting { attempt });
        tokio::time::sleep(Duration::from_secs(config.reconnect_delay_secs)).await;
    }
}

/// Final authoritative refetch: frames may have raced backend persistence,
/// so the snapshot wins before the connection closes for good.
async fn finish(store: &SharedStore, api: &ApiClient, protocol_id: &str) {
    match api.get_protocol(protocol_id).await {
        Ok(protocol) => store.set_snapshot(protocol),
        Err(error) => {
            tracing::warn!(%error, protocol_id, "Terminal refetch failed");
        }
    }
    store.set_connection_health(ConnectionHealth::Idle);
}

/// Degraded mode: periodic snapshot refetch until the workflow leaves its
/// streaming phase. Keeps the UI eventually consistent without the push
/// connection.
async fn fallback_poll(
    store: SharedStore,
    api: Arc<ApiClient>,
    protocol_id: String,
    config: StreamConfig,
) {
    store.set_connection_health(ConnectionHealth::Polling);
    loop {
        tokio::time::sleep(Duration::from_secs(config.fallback_poll_secs)).await;
        match api.get_protocol(&protocol_id).await {
            Ok(protocol) => {
                let settled = !protocol.status.is_stream_eligible();
                store.set_snapshot(protocol);
                if settled {
                    store.set_connection_health(ConnectionHealth::Idle);
                    return;
                }
            }
            Err(error @ (ApiError::SessionExpired | ApiError::NotFound(_))) => {
                // Neither condition can improve by polling harder.
                tracing::warn!(%error, protocol_id, "Stopping fallback poll");
                store.set_connection_health(ConnectionHealth::Idle);
                return;
            }
            Err(error) => {
                tracing::warn!(%error, protocol_id, "Fallback refetch failed; will retry");
            }
        }
    }
}
