//! The protocol view model: the single authoritative in-memory
//! representation of the protocol a user is looking at.
//!
//! All writers (stream controller, action gateway, user-driven edits) go
//! through the mutation entry points here, so the display-authorization and
//! patch-merge invariants are enforced in one place. The store is
//! constructor-injected, never a module-level singleton, so multiple
//! protocol views can coexist and tests get isolated instances.

use crate::protocol::{
    reconcile::reconcile, AgentThought, EmpathyMetrics, Protocol, ProtocolPatch, ProtocolStatus,
    SafetyScore,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// ─── Connection health ───────────────────────────────────────────────────────

/// Observability-only signal from the stream controller. Never affects
/// protocol fields; the UI uses it for a non-blocking warning banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionHealth {
    /// No connection open or wanted.
    #[default]
    Idle,
    /// Push connection open and delivering frames.
    Live,
    /// Connection lost; a bounded reconnect attempt is pending.
    Reconnecting { attempt: u32 },
    /// Reconnect attempts exhausted; degraded to periodic snapshot refetch.
    Polling,
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ProtocolStore {
    protocol_id: String,
    status: ProtocolStatus,
    /// Displayed draft text. Only ever populated while `status` is
    /// display-authorized; incremental chunks append here.
    draft: String,
    /// Draft text as of the last full update (snapshot or authorized patch).
    /// Reconnects roll back to this baseline rather than guessing which
    /// deltas were missed.
    draft_baseline: String,
    /// Last draft known to exist server-side, tracked independently of
    /// display authorization for the approve edit-equals-server check.
    server_draft: String,
    iteration_count: u32,
    safety_score: SafetyScore,
    empathy_metrics: EmpathyMetrics,
    historical_thoughts: Vec<AgentThought>,
    live_thoughts: Vec<AgentThought>,
    health: ConnectionHealth,
    title: String,
    rejected_reason: Option<String>,
}

impl ProtocolStore {
    pub fn new(protocol_id: impl Into<String>) -> Self {
        Self {
            protocol_id: protocol_id.into(),
            status: ProtocolStatus::Drafting,
            draft: String::new(),
            draft_baseline: String::new(),
            server_draft: String::new(),
            iteration_count: 0,
            safety_score: SafetyScore::default(),
            empathy_metrics: EmpathyMetrics::default(),
            historical_thoughts: Vec::new(),
            live_thoughts: Vec::new(),
            health: ConnectionHealth::Idle,
            title: String::new(),
            rejected_reason: None,
        }
    }

    // ── Mutation entry points ────────────────────────────────────────────

    /// Replace-and-seed from a full fetch. Always safe, always wins over
    /// stale partial state: draft, status and metrics are replaced together
    /// and the historical thought log is re-seeded. Live thoughts are kept;
    /// the reconciler dedups them against the refreshed history.
    pub fn set_snapshot(&mut self, protocol: Protocol) {
        if protocol.id != self.protocol_id {
            tracing::warn!(
                expected = %self.protocol_id,
                got = %protocol.id,
                "Ignoring snapshot for a different protocol"
            );
            return;
        }

        self.status = protocol.status;
        self.server_draft = protocol.current_draft.clone();
        self.draft = if protocol.status.is_display_authorized() {
            protocol.current_draft
        } else {
            String::new()
        };
        self.draft_baseline = self.draft.clone();
        self.iteration_count = protocol.iteration_count;
        self.safety_score = protocol.safety_score;
        self.empathy_metrics = protocol.empathy_metrics;
        self.historical_thoughts = protocol.agent_thoughts;
        self.title = protocol.title;
        self.rejected_reason = protocol.rejected_reason;
    }

    /// Merge a `protocol_update` frame. Status, metrics and draft are
    /// updated in one step so readers never observe a torn mix of old
    /// status with new draft text. Draft text in the patch is discarded
    /// when its status is not display-authorized.
    pub fn apply_patch(&mut self, patch: ProtocolPatch) {
        self.status = patch.status;
        self.iteration_count = patch.iteration_count;
        self.safety_score = patch.safety_score;
        self.empathy_metrics = patch.empathy_metrics;

        if patch.status.is_display_authorized() {
            self.server_draft = patch.current_draft.clone();
            self.draft = patch.current_draft;
        } else {
            // Mid-revision text must not leak to the UI.
            self.draft.clear();
        }
        self.draft_baseline = self.draft.clone();
    }

    /// Concatenate an append-only text delta. Dropped unless the current
    /// status authorizes display: a delta during drafting/reviewing is
    /// generation-in-progress text.
    pub fn append_draft_chunk(&mut self, chunk: &str) {
        if !self.status.is_display_authorized() {
            tracing::debug!(
                protocol_id = %self.protocol_id,
                "Dropping draft delta received in non-display state"
            );
            return;
        }
        self.draft.push_str(chunk);
    }

    /// Forward a stream-delivered thought into the live-side buffer.
    pub fn record_thought(&mut self, thought: AgentThought) {
        self.live_thoughts.push(thought);
    }

    pub fn set_connection_health(&mut self, health: ConnectionHealth) {
        if self.health != health {
            tracing::debug!(protocol_id = %self.protocol_id, ?health, "Connection health changed");
        }
        self.health = health;
    }

    /// Discard incremental chunks appended since the last full update.
    /// Called when a reconnect may have missed deltas: a delta is only
    /// meaningful relative to the exact draft state it was emitted against.
    pub fn rollback_unconfirmed_draft(&mut self) {
        if self.draft != self.draft_baseline {
            self.draft = self.draft_baseline.clone();
        }
    }

    /// Reset the live-side thought buffer. Only on a first connection, not
    /// on reconnects, so in-flight history survives transient blips.
    pub fn clear_live_thoughts(&mut self) {
        self.live_thoughts.clear();
    }

    // ── Reads ────────────────────────────────────────────────────────────

    pub fn protocol_id(&self) -> &str {
        &self.protocol_id
    }

    pub fn status(&self) -> ProtocolStatus {
        self.status
    }

    /// Draft text safe to render. Empty until display is authorized.
    pub fn visible_draft(&self) -> &str {
        if self.status.is_display_authorized() {
            &self.draft
        } else {
            ""
        }
    }

    /// Last draft known to exist on the server, regardless of display
    /// authorization.
    pub fn server_draft(&self) -> &str {
        &self.server_draft
    }

    pub fn iteration_count(&self) -> u32 {
        self.iteration_count
    }

    pub fn safety_score(&self) -> &SafetyScore {
        &self.safety_score
    }

    pub fn empathy_metrics(&self) -> &EmpathyMetrics {
        &self.empathy_metrics
    }

    pub fn health(&self) -> ConnectionHealth {
        self.health
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn rejected_reason(&self) -> Option<&str> {
        self.rejected_reason.as_deref()
    }

    /// The deduplicated, chronologically ordered thought log.
    pub fn thoughts(&self) -> Vec<AgentThought> {
        reconcile(&self.historical_thoughts, &self.live_thoughts)
    }
}

// ─── Shared handle ───────────────────────────────────────────────────────────

/// Cloneable handle to one protocol's store. The lock is held only for the
/// duration of a single entry point, never across an await.
#[derive(Debug, Clone)]
pub struct SharedStore {
    inner: Arc<Mutex<ProtocolStore>>,
}

impl SharedStore {
    pub fn new(protocol_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ProtocolStore::new(protocol_id))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProtocolStore> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_snapshot(&self, protocol: Protocol) {
        self.lock().set_snapshot(protocol);
    }

    pub fn apply_patch(&self, patch: ProtocolPatch) {
        self.lock().apply_patch(patch);
    }

    pub fn append_draft_chunk(&self, chunk: &str) {
        self.lock().append_draft_chunk(chunk);
    }

    pub fn record_thought(&self, thought: AgentThought) {
        self.lock().record_thought(thought);
    }

    pub fn set_connection_health(&self, health: ConnectionHealth) {
        self.lock().set_connection_health(health);
    }

    pub fn rollback_unconfirmed_draft(&self) {
        self.lock().rollback_unconfirmed_draft();
    }

    pub fn clear_live_thoughts(&self) {
        self.lock().clear_live_thoughts();
    }

    pub fn protocol_id(&self) -> String {
        self.lock().protocol_id().to_string()
    }

    pub fn status(&self) -> ProtocolStatus {
        self.lock().status()
    }

    pub fn visible_draft(&self) -> String {
        self.lock().visible_draft().to_string()
    }

    pub fn server_draft(&self) -> String {
        self.lock().server_draft().to_string()
    }

    pub fn iteration_count(&self) -> u32 {
        self.lock().iteration_count()
    }

    pub fn health(&self) -> ConnectionHealth {
        self.lock().health()
    }

    pub fn thoughts(&self) -> Vec<AgentThought> {
        self.lock().thoughts()
    }

    /// Run a closure against the locked store, for reads that need several
    /// fields in one consistent view.
    pub fn with<R>(&self, f: impl FnOnce(&ProtocolStore) -> R) -> R {
        f(&self.lock())
    }
}
