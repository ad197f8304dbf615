//! Wire types for the protocol-drafting backend.
//!
//! The backend serializes camelCase keys on both the REST and SSE paths;
//! enum values ride as snake_case strings. Shapes here mirror the server
//! exactly so deserialization is lossless.

pub mod reconcile;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle of a protocol draft.
///
/// `drafting → reviewing → {drafting | awaiting_approval}`, then
/// `awaiting_approval → {approved | rejected}`. `approved`/`rejected` are
/// terminal for the client.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProtocolStatus {
    #[default]
    Drafting,
    Reviewing,
    AwaitingApproval,
    Approved,
    Rejected,
}

impl ProtocolStatus {
    /// Whether `current_draft` is a coherent artifact safe to show in full.
    /// While drafting/reviewing the backend may be mid-revision and partial
    /// text is misleading.
    pub fn is_display_authorized(self) -> bool {
        matches!(
            self,
            Self::AwaitingApproval | Self::Approved | Self::Rejected
        )
    }

    /// Whether holding an open push connection is justified.
    pub fn is_stream_eligible(self) -> bool {
        matches!(self, Self::Drafting | Self::Reviewing)
    }

    /// No further backend-side mutation expected absent a new user action.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

// ─── Agent thoughts ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AgentRole {
    Drafter,
    SafetyGuardian,
    ClinicalCritic,
    Supervisor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ThoughtType {
    Thought,
    Action,
    Feedback,
    Revision,
}

/// One discrete, attributed, timestamped utterance from a backend agent.
///
/// `id` is required for deduplication; the backend omits it in rare cases,
/// in which case the thought is retained but never merged (see
/// [`reconcile::reconcile`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentThought {
    #[serde(default)]
    pub id: Option<String>,
    pub agent_role: AgentRole,
    #[serde(default)]
    pub agent_name: Option<String>,
    pub content: String,
    #[serde(rename = "type")]
    pub thought_type: ThoughtType,
    pub timestamp: DateTime<Utc>,
}

// ─── Metrics ─────────────────────────────────────────────────────────────────

/// Replaced wholesale on each update, never merged field-by-field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SafetyScore {
    #[serde(default)]
    pub score: u8,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EmpathyMetrics {
    #[serde(default)]
    pub score: u8,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

// ─── Protocol aggregate ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Protocol {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub protocol_type: String,
    #[serde(default)]
    pub current_draft: String,
    pub status: ProtocolStatus,
    #[serde(default)]
    pub iteration_count: u32,
    #[serde(default)]
    pub safety_score: SafetyScore,
    #[serde(default)]
    pub empathy_metrics: EmpathyMetrics,
    #[serde(default)]
    pub agent_thoughts: Vec<AgentThought>,
    #[serde(default)]
    pub rejected_reason: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
}

/// A full-field patch carried by a `protocol_update` frame. `current_draft`
/// is conditionally applied: the store discards it unless `status` is
/// display-authorized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolPatch {
    pub status: ProtocolStatus,
    #[serde(default)]
    pub current_draft: String,
    #[serde(default)]
    pub iteration_count: u32,
    #[serde(default)]
    pub safety_score: SafetyScore,
    #[serde(default)]
    pub empathy_metrics: EmpathyMetrics,
}

// ─── List envelope ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolPage {
    pub items: Vec<Protocol>,
    pub total: u64,
    pub skip: u64,
    pub limit: u64,
    pub has_more: bool,
}
