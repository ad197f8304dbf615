//! User-initiated mutations: approve, reject, halt, resume.
//!
//! None of these are idempotent at the backend, so nothing here retries
//! silently; a failure is surfaced to the caller and local state is left
//! unchanged. Validation happens before anything touches the network.

use crate::api::ApiClient;
use crate::error::ActionError;
use crate::protocol::{Protocol, ProtocolStatus};
use crate::store::SharedStore;
use std::sync::Arc;

pub struct ActionGateway {
    api: Arc<ApiClient>,
    store: SharedStore,
}

impl ActionGateway {
    pub fn new(api: Arc<ApiClient>, store: SharedStore) -> Self {
        Self { api, store }
    }

    /// Approve the protocol. If `edited` matches the last known server
    /// draft, no `editedContent` is sent and the server keeps its own copy.
    /// On success the returned protocol re-seeds the store immediately
    /// rather than waiting for a stream tick.
    pub async fn approve(&self, edited: Option<&str>) -> Result<Protocol, ActionError> {
        let protocol_id = self.store.protocol_id();
        let edited_content =
            edited.filter(|text| !text.is_empty() && *text != self.store.server_draft());

        let protocol = self.api.approve(&protocol_id, edited_content).await?;
        self.store.set_snapshot(protocol.clone());
        tracing::info!(protocol_id, "Protocol approved");
        Ok(protocol)
    }

    /// Reject with a mandatory, non-empty reason. An empty reason never
    /// reaches the network layer.
    pub async fn reject(&self, reason: &str) -> Result<Protocol, ActionError> {
        if reason.trim().is_empty() {
            return Err(ActionError::Validation(
                "rejection reason must not be empty".to_string(),
            ));
        }

        let protocol_id = self.store.protocol_id();
        let protocol = self.api.reject(&protocol_id, reason).await?;
        self.store.set_snapshot(protocol.clone());
        tracing::info!(protocol_id, "Protocol rejected");
        Ok(protocol)
    }

    /// Pause the backend workflow. Only meaningful while agents are
    /// actively working; the backend parks the protocol at
    /// awaiting_approval.
    pub async fn halt(&self) -> Result<(), ActionError> {
        let status = self.store.status();
        if !status.is_stream_eligible() {
            return Err(ActionError::InvalidState {
                status: status.to_string(),
            });
        }

        let protocol_id = self.store.protocol_id();
        self.api.halt(&protocol_id).await?;
        tracing::info!(protocol_id, "Protocol halted");
        self.refresh().await;
        Ok(())
    }

    /// Resume a halted workflow. The backend rejects resume outside
    /// awaiting_approval, so the same gate applies client-side.
    pub async fn resume(&self) -> Result<(), ActionError> {
        let status = self.store.status();
        if status != ProtocolStatus::AwaitingApproval {
            return Err(ActionError::InvalidState {
                status: status.to_string(),
            });
        }

        let protocol_id = self.store.protocol_id();
        self.api.resume(&protocol_id).await?;
        tracing::info!(protocol_id, "Protocol resumed");
        self.refresh().await;
        Ok(())
    }

    /// Halt/resume return bare acknowledgements, so converge through one
    /// snapshot fetch. Best effort: a failed refresh is not a failed action.
    async fn refresh(&self) {
        let protocol_id = self.store.protocol_id();
        match self.api.get_protocol(&protocol_id).await {
            Ok(protocol) => self.store.set_snapshot(protocol),
            Err(error) => {
                tracing::warn!(%error, protocol_id, "Post-action refetch failed");
            }
        }
    }
}
