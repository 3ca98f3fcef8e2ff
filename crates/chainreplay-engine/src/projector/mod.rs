mod state;

pub use state::{
    AppliedTransition, DisputeState, LifecycleTracker, SpeculationState, TaskState,
    TransitionCheck,
};

use std::collections::HashSet;
use std::fmt;

use serde_json::{Map, Value};

use chainreplay_parser::parse_raw_event;
use chainreplay_types::{
    projection_hash, DomainPayload, ProjectedTimelineEvent, ProjectedType, ProjectionTrace,
    RawOnChainEvent, ReplayTimelineRecord,
};

/// Strictness of the projection pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectionMode {
    /// Count schema and transition problems in telemetry and keep going.
    #[default]
    Lenient,
    /// Raise on the first schema or transition problem.
    Strict,
}

#[derive(Debug, Clone)]
pub struct ProjectionOptions {
    pub mode: ProjectionMode,
    /// Trace identity; generated when absent. Determinism is guaranteed for
    /// a fixed (input, trace_id, seed) triple.
    pub trace_id: Option<String>,
    pub seed: u64,
    pub created_at_ms: i64,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            mode: ProjectionMode::Lenient,
            trace_id: None,
            seed: 0,
            created_at_ms: 0,
        }
    }
}

/// Counters accumulated over one projection run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProjectionTelemetry {
    pub projected_events: usize,
    pub duplicates_dropped: usize,
    pub malformed_inputs: usize,
    pub unknown_events: usize,
    pub transition_conflicts: usize,
    pub transition_violations: usize,
}

impl ProjectionTelemetry {
    pub fn merge(&mut self, other: &ProjectionTelemetry) {
        self.projected_events += other.projected_events;
        self.duplicates_dropped += other.duplicates_dropped;
        self.malformed_inputs += other.malformed_inputs;
        self.unknown_events += other.unknown_events;
        self.transition_conflicts += other.transition_conflicts;
        self.transition_violations += other.transition_violations;
    }
}

#[derive(Debug, Clone)]
pub struct ProjectionOutput {
    pub trace: ProjectionTrace,
    pub events: Vec<ProjectedTimelineEvent>,
    pub telemetry: ProjectionTelemetry,
}

impl ProjectionOutput {
    /// Stored form of the projected events.
    pub fn records(&self) -> Vec<ReplayTimelineRecord> {
        self.events
            .iter()
            .cloned()
            .map(ReplayTimelineRecord::from_event)
            .collect()
    }
}

/// Strict-mode failure: the offending event plus a stable reason string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrictProjectionError {
    pub category: String,
    pub event_name: String,
    pub signature: String,
    pub reason: String,
}

impl fmt::Display for StrictProjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}@{}: {}",
            self.category, self.event_name, self.signature, self.reason
        )
    }
}

impl std::error::Error for StrictProjectionError {}

/// One emission candidate derived from a typed event, before ordering and
/// state validation.
struct Candidate {
    event_type: ProjectedType,
    /// The parallel `disputed` task projection; emitted only when the task
    /// machine permits it.
    conditional: bool,
    task_pda: Option<String>,
    dispute_pda: Option<String>,
    slot: u64,
    signature: String,
    source_event_name: String,
    source_event_sequence: u64,
    timestamp_ms: i64,
    payload: Value,
}

/// Project a batch of raw on-chain events into the canonical timeline.
///
/// The pipeline is dedupe → parse → map → sort → validate → number → hash.
/// State validation runs in final sort order, so telemetry and output are
/// identical for every permutation of the input batch.
pub fn project(
    inputs: &[RawOnChainEvent],
    options: &ProjectionOptions,
) -> Result<ProjectionOutput, StrictProjectionError> {
    let mut telemetry = ProjectionTelemetry::default();
    let mut seen: HashSet<(u64, String, String)> = HashSet::new();
    let mut candidates: Vec<Candidate> = Vec::new();

    for raw in inputs {
        let key = (raw.slot, raw.signature.clone(), raw.event_name.clone());
        if !seen.insert(key) {
            telemetry.duplicates_dropped += 1;
            continue;
        }

        let typed = match parse_raw_event(raw) {
            Ok(Some(typed)) => typed,
            Ok(None) => {
                telemetry.unknown_events += 1;
                continue;
            }
            Err(parse_error) => {
                telemetry.malformed_inputs += 1;
                if options.mode == ProjectionMode::Strict {
                    let category = chainreplay_parser::event_category(&raw.event_name)
                        .map(|c| c.as_str())
                        .unwrap_or("unknown");
                    return Err(StrictProjectionError {
                        category: category.to_string(),
                        event_name: raw.event_name.clone(),
                        signature: raw.signature.clone(),
                        reason: parse_error.to_string(),
                    });
                }
                continue;
            }
        };

        let payload = build_payload(&typed.payload, raw);
        for (event_type, conditional) in projections_for(&typed.payload) {
            candidates.push(Candidate {
                event_type,
                conditional,
                task_pda: typed.payload.task_pda().map(|s| s.to_string()),
                dispute_pda: typed.payload.dispute_pda().map(|s| s.to_string()),
                slot: raw.slot,
                signature: raw.signature.clone(),
                source_event_name: raw.event_name.clone(),
                source_event_sequence: raw.source_event_sequence,
                timestamp_ms: raw.timestamp_ms,
                payload: payload.clone(),
            });
        }
    }

    // Final ordering: slot, signature, source_event_name,
    // source_event_sequence, type, task_pda (absent last).
    candidates.sort_by(|a, b| {
        (
            a.slot,
            &a.signature,
            &a.source_event_name,
            a.source_event_sequence,
            a.event_type.as_str(),
            a.task_pda.is_none(),
            &a.task_pda,
        )
            .cmp(&(
                b.slot,
                &b.signature,
                &b.source_event_name,
                b.source_event_sequence,
                b.event_type.as_str(),
                b.task_pda.is_none(),
                &b.task_pda,
            ))
    });

    let mut tracker = LifecycleTracker::new();
    let mut events: Vec<ProjectedTimelineEvent> = Vec::new();

    for candidate in candidates {
        let verdict = if candidate.conditional {
            // The parallel `disputed` projection: gated, never emitted when
            // the task machine forbids it, but still counted.
            match candidate.task_pda.as_deref() {
                Some(task_id) => match tracker.task_permits_dispute(task_id) {
                    TransitionCheck::Ok => {
                        tracker.apply(&candidate.event_type, task_id);
                        TransitionCheck::Ok
                    }
                    blocked => blocked,
                },
                None => TransitionCheck::Violation,
            }
        } else {
            match entity_for(&candidate) {
                Some(entity_id) => tracker
                    .apply(&candidate.event_type, &entity_id)
                    .map(|applied| applied.check)
                    .unwrap_or(TransitionCheck::Ok),
                None => TransitionCheck::Ok,
            }
        };

        match verdict {
            TransitionCheck::Ok => {}
            TransitionCheck::Conflict => {
                telemetry.transition_conflicts += 1;
                if options.mode == ProjectionMode::Strict && !candidate.conditional {
                    return Err(strict_transition_error(&candidate, "conflicting_transition"));
                }
            }
            TransitionCheck::Violation => {
                telemetry.transition_violations += 1;
                if options.mode == ProjectionMode::Strict && !candidate.conditional {
                    return Err(strict_transition_error(&candidate, "invalid_transition"));
                }
            }
        }

        if candidate.conditional && verdict != TransitionCheck::Ok {
            continue;
        }

        events.push(ProjectedTimelineEvent {
            seq: events.len() as u64 + 1,
            event_type: candidate.event_type,
            task_pda: candidate.task_pda,
            dispute_pda: candidate.dispute_pda,
            slot: candidate.slot,
            signature: candidate.signature,
            source_event_name: candidate.source_event_name,
            source_event_sequence: candidate.source_event_sequence,
            timestamp_ms: candidate.timestamp_ms,
            payload: candidate.payload,
            projection_hash: String::new(),
        });
    }

    for event in &mut events {
        event.projection_hash = projection_hash(event);
    }
    telemetry.projected_events = events.len();

    let trace_id = options
        .trace_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    Ok(ProjectionOutput {
        trace: ProjectionTrace {
            schema_version: 1,
            trace_id,
            seed: options.seed,
            created_at_ms: options.created_at_ms,
            events: events.clone(),
        },
        events,
        telemetry,
    })
}

fn strict_transition_error(candidate: &Candidate, reason: &str) -> StrictProjectionError {
    StrictProjectionError {
        category: candidate.event_type.category().to_string(),
        event_name: candidate.source_event_name.clone(),
        signature: candidate.signature.clone(),
        reason: reason.to_string(),
    }
}

/// Entity key of the machine a projection belongs to.
fn entity_for(candidate: &Candidate) -> Option<String> {
    match candidate.event_type.category() {
        "task" | "speculation" => candidate.task_pda.clone(),
        "dispute" => candidate.dispute_pda.clone(),
        _ => None,
    }
}

/// Map a typed payload to its projected timeline tags.
///
/// Dispute initiations emit both the dispute projection and the conditional
/// parallel task transition; the two are never deduplicated. Bond accounting
/// (`bond_locked`, `bond_deposited`), arbiter cleanup and the agent
/// lifecycle have no timeline tag and are parsed but not projected.
fn projections_for(payload: &DomainPayload) -> Vec<(ProjectedType, bool)> {
    use DomainPayload::*;
    match payload {
        TaskCreated(_) | DependentTaskCreated(_) => vec![(ProjectedType::Discovered, false)],
        TaskClaimed(_) => vec![(ProjectedType::Claimed, false)],
        TaskCompleted(_) => vec![(ProjectedType::Completed, false)],
        TaskCancelled(_) => vec![(ProjectedType::Failed, false)],
        DisputeInitiated(_) => vec![
            (ProjectedType::DisputeInitiated, false),
            (ProjectedType::Disputed, true),
        ],
        DisputeVoteCast(_) => vec![(ProjectedType::DisputeVoteCast, false)],
        DisputeResolved(_) => vec![(ProjectedType::DisputeResolved, false)],
        DisputeCancelled(_) => vec![(ProjectedType::DisputeCancelled, false)],
        DisputeExpired(_) => vec![(ProjectedType::DisputeExpired, false)],
        ArbiterVotesCleanedUp(_) => vec![],
        SpeculativeCommitmentCreated(_) => vec![(ProjectedType::SpeculationStarted, false)],
        BondReleased(_) => vec![(ProjectedType::SpeculationConfirmed, false)],
        BondSlashed(_) => vec![(ProjectedType::SpeculationAborted, false)],
        BondLocked(_) | BondDeposited(_) => vec![],
        AgentRegistered(_) | AgentUpdated(_) | AgentDeregistered(_) | AgentSuspended(_)
        | AgentUnsuspended(_) | ReputationChanged(_) => vec![],
        ProtocolInitialized(_) => vec![(ProjectedType::protocol("initialized"), false)],
        StateUpdated(_) => vec![(ProjectedType::protocol("state_updated"), false)],
        RewardDistributed(_) => vec![(ProjectedType::protocol("reward_distributed"), false)],
        RateLimitHit(_) => vec![(ProjectedType::protocol("rate_limit_hit"), false)],
        RateLimitsUpdated(_) => vec![(ProjectedType::protocol("rate_limits_updated"), false)],
        ProtocolFeeUpdated(_) => vec![(ProjectedType::protocol("fee_updated"), false)],
        MigrationCompleted(_) => vec![(ProjectedType::protocol("migration_completed"), false)],
        ProtocolVersionUpdated(_) => vec![(ProjectedType::protocol("version_updated"), false)],
    }
}

/// Canonical payload of a projection: the parser-promoted fields plus the
/// `onchain` provenance block.
fn build_payload(payload: &DomainPayload, raw: &RawOnChainEvent) -> Value {
    let mut value = payload.payload_value();
    if let Value::Object(map) = &mut value {
        let mut onchain = Map::new();
        onchain.insert(
            "signature".to_string(),
            Value::from(raw.signature.clone()),
        );
        onchain.insert("slot".to_string(), Value::from(raw.slot));
        onchain.insert(
            "event_type".to_string(),
            Value::from(raw.event_name.clone()),
        );
        map.insert("onchain".to_string(), Value::Object(onchain));
    }
    value
}
