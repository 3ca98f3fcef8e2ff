mod evidence;

pub use evidence::{
    build_evidence_pack, seal_values, verify_evidence_pack_integrity, EvidenceOptions,
};

use std::collections::BTreeSet;
use std::collections::HashMap;

use serde_json::Value;

use chainreplay_types::{
    case_id, ActorEntry, ActorRole, AnomalyRef, CaseStatus, EntityKind, IncidentCase,
    ProjectedTimelineEvent, ReplayAnomaly, SlotWindow, TraceWindow, TransitionRecord,
};

use crate::projector::{LifecycleTracker, TransitionCheck};

/// Inputs to one incident reconstruction.
#[derive(Debug, Clone, Default)]
pub struct IncidentInput<'a> {
    pub events: &'a [ProjectedTimelineEvent],
    pub anomalies: &'a [ReplayAnomaly],
    pub window: Option<SlotWindow>,
    pub metadata: Option<Value>,
    pub created_at_ms: i64,
}

/// Payload keys that identify actors, with the role each key implies.
const ACTOR_FIELDS: [(&str, ActorRole); 10] = [
    ("creator", ActorRole::Creator),
    ("worker", ActorRole::Worker),
    ("voter", ActorRole::Arbiter),
    ("authority", ActorRole::Authority),
    ("initiator", ActorRole::Unknown),
    ("defendant", ActorRole::Unknown),
    ("recipient", ActorRole::Unknown),
    ("updater", ActorRole::Authority),
    ("updated_by", ActorRole::Authority),
    ("agent", ActorRole::Unknown),
];

/// Build a hash-stable incident case from a projected window.
pub fn build_incident_case(input: &IncidentInput<'_>) -> IncidentCase {
    let mut events: Vec<&ProjectedTimelineEvent> = input.events.iter().collect();
    events.sort_by(|a, b| {
        (
            a.seq,
            a.slot,
            a.timestamp_ms,
            &a.signature,
            &a.source_event_name,
            a.event_type.as_str(),
            &a.task_pda,
        )
            .cmp(&(
                b.seq,
                b.slot,
                b.timestamp_ms,
                &b.signature,
                &b.source_event_name,
                b.event_type.as_str(),
                &b.task_pda,
            ))
    });

    let trace_window = resolve_window(&events, input.window);
    let windowed: Vec<&ProjectedTimelineEvent> = events
        .iter()
        .copied()
        .filter(|e| e.slot >= trace_window.from_slot && e.slot <= trace_window.to_slot)
        .collect();

    let (transitions, all_valid, all_terminal) = build_transitions(&windowed);
    let actor_map = build_actor_map(&windowed);

    let task_ids: Vec<String> = windowed
        .iter()
        .filter_map(|e| e.task_pda.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let dispute_ids: Vec<String> = windowed
        .iter()
        .filter_map(|e| e.dispute_pda.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let anomalies: Vec<AnomalyRef> = input
        .anomalies
        .iter()
        .map(|a| AnomalyRef {
            anomaly_id: a.anomaly_id.clone(),
            code: a.code,
            severity: a.severity,
            message: a.message.clone(),
            seq: a.context.seq,
        })
        .collect();
    let anomaly_ids: Vec<String> = anomalies.iter().map(|a| a.anomaly_id.clone()).collect();

    let case_status = if !all_valid || !anomalies.is_empty() {
        CaseStatus::Flagged
    } else if all_terminal {
        CaseStatus::Resolved
    } else {
        CaseStatus::Open
    };

    let event_values: Vec<Value> = windowed
        .iter()
        .map(|e| event_to_value(e))
        .collect();
    let evidence_hashes = vec![chainreplay_types::events_hash(&event_values)];

    IncidentCase {
        schema_version: IncidentCase::SCHEMA_VERSION,
        case_id: case_id(
            trace_window.from_slot,
            trace_window.to_slot,
            &task_ids,
            &dispute_ids,
        ),
        created_at_ms: input.created_at_ms,
        trace_window,
        transitions,
        anomaly_ids,
        anomalies,
        actor_map,
        evidence_hashes,
        case_status,
        task_ids,
        dispute_ids,
        metadata: input.metadata.clone(),
    }
}

/// Render a projected event into its canonical JSON view. Shared between
/// evidence hashing and the pack artifacts.
pub fn event_to_value(event: &ProjectedTimelineEvent) -> Value {
    let mut map = serde_json::Map::new();
    map.insert("seq".to_string(), Value::from(event.seq));
    map.insert(
        "type".to_string(),
        Value::from(event.event_type.as_str().to_string()),
    );
    if let Some(task_pda) = &event.task_pda {
        map.insert("task_pda".to_string(), Value::from(task_pda.clone()));
    }
    if let Some(dispute_pda) = &event.dispute_pda {
        map.insert("dispute_pda".to_string(), Value::from(dispute_pda.clone()));
    }
    map.insert("slot".to_string(), Value::from(event.slot));
    map.insert("signature".to_string(), Value::from(event.signature.clone()));
    map.insert(
        "source_event_name".to_string(),
        Value::from(event.source_event_name.clone()),
    );
    map.insert(
        "source_event_sequence".to_string(),
        Value::from(event.source_event_sequence),
    );
    map.insert("timestamp_ms".to_string(), Value::from(event.timestamp_ms));
    map.insert("payload".to_string(), event.payload.clone());
    map.insert(
        "projection_hash".to_string(),
        Value::from(event.projection_hash.clone()),
    );
    Value::Object(map)
}

fn resolve_window(
    events: &[&ProjectedTimelineEvent],
    overrides: Option<SlotWindow>,
) -> TraceWindow {
    if events.is_empty() {
        return TraceWindow::default();
    }
    let min_slot = events.iter().map(|e| e.slot).min().unwrap_or(0);
    let max_slot = events.iter().map(|e| e.slot).max().unwrap_or(0);
    let min_ts = events.iter().map(|e| e.timestamp_ms).min().unwrap_or(0);
    let max_ts = events.iter().map(|e| e.timestamp_ms).max().unwrap_or(0);

    let overrides = overrides.unwrap_or_default();
    // Overrides clamp to the observed inclusive range.
    let from_slot = overrides
        .from_slot
        .map(|s| s.clamp(min_slot, max_slot))
        .unwrap_or(min_slot);
    let to_slot = overrides
        .to_slot
        .map(|s| s.clamp(from_slot, max_slot))
        .unwrap_or(max_slot);

    let windowed: Vec<&&ProjectedTimelineEvent> = events
        .iter()
        .filter(|e| e.slot >= from_slot && e.slot <= to_slot)
        .collect();
    let from_ts = windowed
        .iter()
        .map(|e| e.timestamp_ms)
        .min()
        .unwrap_or(min_ts);
    let to_ts = windowed
        .iter()
        .map(|e| e.timestamp_ms)
        .max()
        .unwrap_or(max_ts);

    TraceWindow {
        from_slot,
        to_slot,
        from_ts,
        to_ts,
    }
}

fn build_transitions(
    events: &[&ProjectedTimelineEvent],
) -> (Vec<TransitionRecord>, bool, bool) {
    let mut tracker = LifecycleTracker::new();
    let mut transitions = Vec::new();
    let mut all_valid = true;

    for event in events {
        let (entity_kind, entity_id) = match event.event_type.category() {
            "task" => (EntityKind::Task, event.task_pda.clone()),
            "dispute" => (EntityKind::Dispute, event.dispute_pda.clone()),
            "speculation" => (EntityKind::Speculation, event.task_pda.clone()),
            _ => continue,
        };
        let Some(entity_id) = entity_id else {
            continue;
        };
        let Some(applied) = tracker.apply(&event.event_type, &entity_id) else {
            continue;
        };
        let valid = applied.check == TransitionCheck::Ok;
        all_valid &= valid;
        transitions.push(TransitionRecord {
            entity_kind,
            entity_id,
            from: applied.from.map(|s| s.to_string()),
            to: applied.to.to_string(),
            seq: event.seq,
            slot: event.slot,
            signature: event.signature.clone(),
            valid,
        });
    }

    let all_terminal = tracker.all_terminal();
    (transitions, all_valid, all_terminal)
}

fn build_actor_map(events: &[&ProjectedTimelineEvent]) -> Vec<ActorEntry> {
    let mut actors: HashMap<String, (ActorRole, u64)> = HashMap::new();

    for event in events {
        let Some(payload) = event.payload.as_object() else {
            continue;
        };
        for (field, role) in ACTOR_FIELDS {
            let Some(pubkey) = payload.get(field).and_then(|v| v.as_str()) else {
                continue;
            };
            actors
                .entry(pubkey.to_string())
                .and_modify(|(existing_role, _)| {
                    if role.priority() < existing_role.priority() {
                        *existing_role = role;
                    }
                })
                .or_insert((role, event.seq));
        }
    }

    let mut entries: Vec<ActorEntry> = actors
        .into_iter()
        .map(|(pubkey, (role, first_seen_seq))| ActorEntry {
            pubkey,
            role,
            first_seen_seq,
        })
        .collect();
    entries.sort_by(|a, b| (a.first_seen_seq, &a.pubkey).cmp(&(b.first_seen_seq, &b.pubkey)));
    entries
}
