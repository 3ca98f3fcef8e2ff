use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::anomaly::{AnomalyCode, Severity};

/// Optional slot bounds supplied by the caller of the incident builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_slot: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_slot: Option<u64>,
}

/// Resolved, inclusive bounds of the incident window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceWindow {
    pub from_slot: u64,
    pub to_slot: u64,
    pub from_ts: i64,
    pub to_ts: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Task,
    Dispute,
    Speculation,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Task => "task",
            EntityKind::Dispute => "dispute",
            EntityKind::Speculation => "speculation",
        }
    }
}

/// One observed state transition of one entity within the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub entity_kind: EntityKind,
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub to: String,
    pub seq: u64,
    pub slot: u64,
    pub signature: String,
    pub valid: bool,
}

/// Actor role, highest first. When one key appears in several roles the
/// highest-priority role wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Creator,
    Worker,
    Arbiter,
    Authority,
    Unknown,
}

impl ActorRole {
    pub fn priority(&self) -> u8 {
        match self {
            ActorRole::Creator => 0,
            ActorRole::Worker => 1,
            ActorRole::Arbiter => 2,
            ActorRole::Authority => 3,
            ActorRole::Unknown => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorEntry {
    pub pubkey: String,
    pub role: ActorRole,
    pub first_seen_seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    /// Every tracked entity reached a terminal state and no anomalies.
    Resolved,
    /// At least one entity is still mid-lifecycle.
    Open,
    /// Anomalies or invalid transitions observed inside the window.
    Flagged,
}

/// Anomaly reference embedded in a case (normalized subset of the full
/// anomaly).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRef {
    pub anomaly_id: String,
    pub code: AnomalyCode,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

/// Hash-stable incident case view. Emitted once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentCase {
    pub schema_version: u32,
    pub case_id: String,
    pub created_at_ms: i64,
    pub trace_window: TraceWindow,
    pub transitions: Vec<TransitionRecord>,
    pub anomaly_ids: Vec<String>,
    pub anomalies: Vec<AnomalyRef>,
    pub actor_map: Vec<ActorEntry>,
    pub evidence_hashes: Vec<String>,
    pub case_status: CaseStatus,
    pub task_ids: Vec<String>,
    pub dispute_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl IncidentCase {
    pub const SCHEMA_VERSION: u32 = 1;
}

/// Inclusive slot bounds recorded in an evidence manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotCursor {
    pub start: u64,
    pub end: u64,
}

/// Evidence pack manifest: the tamper-evidence anchor for the pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceManifest {
    pub schema_version: u32,
    pub query_hash: String,
    pub case_hash: String,
    pub events_hash: String,
    pub sealed: bool,
    pub slot_cursor: SlotCursor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub tool_fingerprint: String,
}

impl EvidenceManifest {
    pub const SCHEMA_VERSION: u32 = 1;
}

/// Three-artifact evidence bundle. `case_data` and `events` are held as
/// JSON values so redaction can rewrite them field-by-field; the manifest
/// hashes pin the exact (possibly sealed) content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidencePack {
    pub manifest: EvidenceManifest,
    pub case_data: Value,
    pub events: Vec<Value>,
}

/// Redaction applied when sealing an evidence pack. Irreversible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RedactionPolicy {
    #[serde(default)]
    pub remove_fields: Vec<String>,
    #[serde(default)]
    pub mask_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncate_actor_keys: Option<usize>,
    #[serde(default)]
    pub hash_signatures: bool,
}

impl RedactionPolicy {
    pub fn is_noop(&self) -> bool {
        self.remove_fields.is_empty()
            && self.mask_fields.is_empty()
            && self.truncate_actor_keys.is_none()
            && !self.hash_signatures
    }
}

/// Outcome of recomputing an evidence pack's hashes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub valid: bool,
    pub errors: Vec<String>,
}
