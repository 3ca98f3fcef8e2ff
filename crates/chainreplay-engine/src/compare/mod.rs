use serde::{Deserialize, Serialize};
use serde_json::Value;

use chainreplay_types::{
    canonical_stringify, AnomalyCode, AnomalyContext, ProjectedTimelineEvent, ReplayAnomaly,
    Severity, TrajectoryEvent, TrajectoryTrace,
};

/// How far ahead of the alignment cursor a peer may sit before the pairing
/// counts as out of order.
const ALIGN_WINDOW: usize = 16;

/// Default number of anomalies included inline in a report.
const TOP_ANOMALY_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    #[default]
    Lenient,
    Strict,
}

impl Strictness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strictness::Lenient => "lenient",
            Strictness::Strict => "strict",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareStatus {
    Clean,
    Mismatched,
}

impl CompareStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareStatus::Clean => "clean",
            CompareStatus::Mismatched => "mismatched",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    pub strictness: Strictness,
    /// Payload fields stripped from reported anomalies.
    pub redact_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub status: CompareStatus,
    pub strictness: Strictness,
    pub anomaly_ids: Vec<String>,
    pub top_anomalies: Vec<ReplayAnomaly>,
    pub mismatch_count: usize,
    pub projected_event_count: usize,
    pub local_event_count: usize,
    pub redactions_applied: usize,
}

/// Alignment identity of an event on either side.
fn alignment_key(event_type: &str, task_pda: Option<&str>, dispute_pda: Option<&str>) -> (String, String, String) {
    (
        event_type.to_string(),
        task_pda.unwrap_or("").to_string(),
        dispute_pda.unwrap_or("").to_string(),
    )
}

/// Compare a locally recorded trajectory against the projected timeline.
///
/// Both streams are walked in canonical order — projected `(slot, signature,
/// seq)`, local `(seq)` — and paired on `(type, task_pda, dispute_pda)`
/// within a sliding window. The result is independent of ingestion order.
pub fn compare_trajectory(
    projected: &[ProjectedTimelineEvent],
    trace: &TrajectoryTrace,
    options: &CompareOptions,
) -> ComparisonReport {
    let mut projected: Vec<&ProjectedTimelineEvent> = projected.iter().collect();
    projected.sort_by(|a, b| {
        (a.slot, &a.signature, a.seq).cmp(&(b.slot, &b.signature, b.seq))
    });

    let mut local: Vec<&TrajectoryEvent> = trace.events.iter().collect();
    local.sort_by_key(|e| e.seq);

    let mut anomalies: Vec<ReplayAnomaly> = Vec::new();
    let mut redactions_applied = 0usize;
    let mut consumed = vec![false; local.len()];
    let mut cursor = 0usize;

    for event in &projected {
        while cursor < local.len() && consumed[cursor] {
            cursor += 1;
        }

        let key = alignment_key(
            event.event_type.as_str(),
            event.task_pda.as_deref(),
            event.dispute_pda.as_deref(),
        );

        let window_end = (cursor + ALIGN_WINDOW).min(local.len());
        let in_window = (cursor..window_end).find(|&i| {
            !consumed[i]
                && alignment_key(
                    local[i].event_type.as_str(),
                    local[i].task_pda.as_deref(),
                    local[i].dispute_pda.as_deref(),
                ) == key
        });

        match in_window {
            Some(i) => {
                consumed[i] = true;
                if let Some(anomaly) =
                    payload_anomaly(event, local[i], trace, options, &mut redactions_applied)
                {
                    anomalies.push(anomaly);
                }
            }
            None => {
                let out_of_window = (window_end..local.len()).find(|&i| {
                    !consumed[i]
                        && alignment_key(
                            local[i].event_type.as_str(),
                            local[i].task_pda.as_deref(),
                            local[i].dispute_pda.as_deref(),
                        ) == key
                });

                if let Some(i) = out_of_window {
                    consumed[i] = true;
                    anomalies.push(ReplayAnomaly::new(
                        AnomalyCode::OrderMismatch,
                        Severity::Warning,
                        format!(
                            "local peer for {} found {} positions past the alignment window",
                            event.event_type,
                            i - window_end + 1
                        ),
                        projected_context(event, trace),
                        None,
                        None,
                    ));
                } else if let Some(i) = scope_peer_at_cursor(&local, &consumed, cursor, event) {
                    // Same entity, different tag, aligned position.
                    consumed[i] = true;
                    anomalies.push(ReplayAnomaly::new(
                        AnomalyCode::TypeMismatch,
                        Severity::Error,
                        format!(
                            "local recorded {} where projection has {}",
                            local[i].event_type, event.event_type
                        ),
                        projected_context(event, trace),
                        Some(redact(
                            local[i].payload.clone(),
                            &options.redact_fields,
                            &mut redactions_applied,
                        )),
                        Some(redact(
                            event.payload.clone(),
                            &options.redact_fields,
                            &mut redactions_applied,
                        )),
                    ));
                } else {
                    anomalies.push(ReplayAnomaly::new(
                        AnomalyCode::UnexpectedEvent,
                        Severity::Warning,
                        format!("projected {} has no local peer", event.event_type),
                        projected_context(event, trace),
                        None,
                        Some(redact(
                            event.payload.clone(),
                            &options.redact_fields,
                            &mut redactions_applied,
                        )),
                    ));
                }
            }
        }
    }

    for (i, local_event) in local.iter().enumerate() {
        if consumed[i] {
            continue;
        }
        anomalies.push(ReplayAnomaly::new(
            AnomalyCode::MissingEvent,
            Severity::Error,
            format!("local {} has no projected peer", local_event.event_type),
            local_context(local_event, trace),
            Some(redact(
                local_event.payload.clone(),
                &options.redact_fields,
                &mut redactions_applied,
            )),
            None,
        ));
    }

    if options.strictness == Strictness::Strict {
        for anomaly in &mut anomalies {
            if anomaly.severity == Severity::Warning {
                anomaly.severity = Severity::Error;
            }
        }
    }

    let mismatch_count = anomalies.len();
    let anomaly_ids: Vec<String> = anomalies.iter().map(|a| a.anomaly_id.clone()).collect();

    // Severity first, discovery order second.
    let mut ranked: Vec<(usize, ReplayAnomaly)> = anomalies.into_iter().enumerate().collect();
    ranked.sort_by(|(ia, a), (ib, b)| b.severity.cmp(&a.severity).then(ia.cmp(ib)));
    let top_anomalies: Vec<ReplayAnomaly> = ranked
        .into_iter()
        .take(TOP_ANOMALY_LIMIT)
        .map(|(_, a)| a)
        .collect();

    ComparisonReport {
        status: if mismatch_count == 0 {
            CompareStatus::Clean
        } else {
            CompareStatus::Mismatched
        },
        strictness: options.strictness,
        anomaly_ids,
        top_anomalies,
        mismatch_count,
        projected_event_count: projected.len(),
        local_event_count: local.len(),
        redactions_applied,
    }
}

/// Local event at the alignment cursor sharing the projected event's entity
/// scope but not its tag.
fn scope_peer_at_cursor(
    local: &[&TrajectoryEvent],
    consumed: &[bool],
    cursor: usize,
    event: &ProjectedTimelineEvent,
) -> Option<usize> {
    if cursor >= local.len() || consumed[cursor] {
        return None;
    }
    let peer = local[cursor];
    let same_scope = peer.task_pda == event.task_pda && peer.dispute_pda == event.dispute_pda;
    if same_scope && peer.event_type != event.event_type {
        Some(cursor)
    } else {
        None
    }
}

fn payload_anomaly(
    event: &ProjectedTimelineEvent,
    peer: &TrajectoryEvent,
    trace: &TrajectoryTrace,
    options: &CompareOptions,
    redactions_applied: &mut usize,
) -> Option<ReplayAnomaly> {
    let path = first_diff_path(&peer.payload, &event.payload)?;
    Some(ReplayAnomaly::new(
        AnomalyCode::PayloadMismatch,
        Severity::Warning,
        format!("payload differs at {}", path),
        projected_context(event, trace),
        Some(redact(
            peer.payload.clone(),
            &options.redact_fields,
            redactions_applied,
        )),
        Some(redact(
            event.payload.clone(),
            &options.redact_fields,
            redactions_applied,
        )),
    ))
}

fn projected_context(event: &ProjectedTimelineEvent, trace: &TrajectoryTrace) -> AnomalyContext {
    AnomalyContext {
        seq: Some(event.seq),
        task_pda: event.task_pda.clone(),
        dispute_pda: event.dispute_pda.clone(),
        source_event_name: Some(event.source_event_name.clone()),
        signature: Some(event.signature.clone()),
        trace_id: Some(trace.trace_id.clone()),
        event_type: Some(event.event_type.as_str().to_string()),
        sampled: None,
    }
}

fn local_context(event: &TrajectoryEvent, trace: &TrajectoryTrace) -> AnomalyContext {
    AnomalyContext {
        seq: Some(event.seq),
        task_pda: event.task_pda.clone(),
        dispute_pda: event.dispute_pda.clone(),
        source_event_name: None,
        signature: None,
        trace_id: Some(trace.trace_id.clone()),
        event_type: Some(event.event_type.as_str().to_string()),
        sampled: None,
    }
}

/// First JSON path (dotted, array indices bracketed) where two values
/// disagree under canonical equality.
pub fn first_diff_path(local: &Value, projected: &Value) -> Option<String> {
    if canonical_stringify(local) == canonical_stringify(projected) {
        return None;
    }
    Some(diff_path(local, projected, String::new()))
}

fn diff_path(local: &Value, projected: &Value, prefix: String) -> String {
    match (local, projected) {
        (Value::Object(a), Value::Object(b)) => {
            let mut keys: Vec<&String> = a.keys().chain(b.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let child_prefix = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                match (a.get(key), b.get(key)) {
                    (Some(av), Some(bv)) => {
                        if canonical_stringify(av) != canonical_stringify(bv) {
                            return diff_path(av, bv, child_prefix);
                        }
                    }
                    _ => return child_prefix,
                }
            }
            prefix
        }
        (Value::Array(a), Value::Array(b)) => {
            for (i, (av, bv)) in a.iter().zip(b.iter()).enumerate() {
                if canonical_stringify(av) != canonical_stringify(bv) {
                    return diff_path(av, bv, format!("{}[{}]", prefix, i));
                }
            }
            format!("{}.length", prefix)
        }
        _ => prefix,
    }
}

/// Strip redacted fields from a payload before it enters a report.
fn redact(mut value: Value, fields: &[String], applied: &mut usize) -> Value {
    if fields.is_empty() {
        return value;
    }
    redact_in_place(&mut value, fields, applied);
    value
}

fn redact_in_place(value: &mut Value, fields: &[String], applied: &mut usize) {
    match value {
        Value::Object(map) => {
            for field in fields {
                if map.remove(field).is_some() {
                    *applied += 1;
                }
            }
            for child in map.values_mut() {
                redact_in_place(child, fields, applied);
            }
        }
        Value::Array(items) => {
            for child in items {
                redact_in_place(child, fields, applied);
            }
        }
        _ => {}
    }
}
