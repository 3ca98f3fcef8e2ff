use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{ProjectedTimelineEvent, ProjectedType};

/// Full projection output trace: the ordered projected events plus the
/// inputs that pin determinism (trace id and seed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionTrace {
    pub schema_version: u32,
    pub trace_id: String,
    pub seed: u64,
    pub created_at_ms: i64,
    pub events: Vec<ProjectedTimelineEvent>,
}

/// A locally recorded trajectory, compared against the projected timeline.
///
/// The local form is reduced: it drops chain provenance (slot, signature,
/// hashes) and keeps only what a local recorder observes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryTrace {
    pub schema_version: u32,
    pub trace_id: String,
    pub seed: u64,
    pub created_at_ms: i64,
    pub events: Vec<TrajectoryEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryEvent {
    pub seq: u64,
    #[serde(rename = "type")]
    pub event_type: ProjectedType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_pda: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispute_pda: Option<String>,
    pub timestamp_ms: i64,
    pub payload: Value,
}

impl TrajectoryTrace {
    pub const SCHEMA_VERSION: u32 = 1;

    /// Reduce a projection trace to the local trajectory form. Used to seed
    /// round-trip comparisons and by local recorders that mirror the
    /// projection contract.
    pub fn from_projection(trace: &ProjectionTrace) -> Self {
        Self {
            schema_version: Self::SCHEMA_VERSION,
            trace_id: trace.trace_id.clone(),
            seed: trace.seed,
            created_at_ms: trace.created_at_ms,
            events: trace
                .events
                .iter()
                .map(|e| TrajectoryEvent {
                    seq: e.seq,
                    event_type: e.event_type.clone(),
                    task_pda: e.task_pda.clone(),
                    dispute_pda: e.dispute_pda.clone(),
                    timestamp_ms: e.timestamp_ms,
                    payload: e.payload.clone(),
                })
                .collect(),
        }
    }
}
