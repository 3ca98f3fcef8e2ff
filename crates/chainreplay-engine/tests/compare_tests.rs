use chainreplay_engine::{
    compare_trajectory, project, CompareOptions, CompareStatus, ProjectionMode,
    ProjectionOptions, Strictness,
};
use chainreplay_testing::clean_task_fixture;
use chainreplay_types::{AnomalyCode, ProjectedType, Severity, TrajectoryTrace};
use serde_json::json;

fn projected_and_trace() -> (Vec<chainreplay_types::ProjectedTimelineEvent>, TrajectoryTrace) {
    let output = project(
        &clean_task_fixture(),
        &ProjectionOptions {
            mode: ProjectionMode::Lenient,
            trace_id: Some("compare-trace".to_string()),
            seed: 11,
            created_at_ms: 0,
        },
    )
    .unwrap();
    let trace = TrajectoryTrace::from_projection(&output.trace);
    (output.events, trace)
}

#[test]
fn test_round_trip_is_clean() {
    let (events, trace) = projected_and_trace();
    let report = compare_trajectory(&events, &trace, &CompareOptions::default());

    assert_eq!(report.status, CompareStatus::Clean);
    assert_eq!(report.mismatch_count, 0);
    assert_eq!(report.projected_event_count, 3);
    assert_eq!(report.local_event_count, 3);
    assert!(report.anomaly_ids.is_empty());
}

#[test]
fn test_missing_local_event() {
    let (events, mut trace) = projected_and_trace();
    // Locally recorded an extra failure the chain never saw.
    let mut extra = trace.events[2].clone();
    extra.seq = 4;
    extra.event_type = ProjectedType::Failed;
    trace.events.push(extra);

    let report = compare_trajectory(&events, &trace, &CompareOptions::default());
    assert_eq!(report.status, CompareStatus::Mismatched);
    assert_eq!(report.mismatch_count, 1);
    assert_eq!(report.top_anomalies[0].code, AnomalyCode::MissingEvent);
    assert_eq!(report.top_anomalies[0].severity, Severity::Error);
}

#[test]
fn test_unexpected_projected_event() {
    let (events, mut trace) = projected_and_trace();
    // The local recorder missed the completion.
    trace.events.retain(|e| e.event_type != ProjectedType::Completed);

    let report = compare_trajectory(&events, &trace, &CompareOptions::default());
    assert_eq!(report.mismatch_count, 1);
    assert_eq!(report.top_anomalies[0].code, AnomalyCode::UnexpectedEvent);
}

#[test]
fn test_payload_mismatch_reports_json_path() {
    let (events, mut trace) = projected_and_trace();
    trace.events[0].payload["reward"] = json!(9_999u64);

    let report = compare_trajectory(&events, &trace, &CompareOptions::default());
    assert_eq!(report.mismatch_count, 1);
    let anomaly = &report.top_anomalies[0];
    assert_eq!(anomaly.code, AnomalyCode::PayloadMismatch);
    assert!(anomaly.message.contains("reward"), "{}", anomaly.message);
    assert!(anomaly.local_payload.is_some());
    assert!(anomaly.projected_payload.is_some());
}

#[test]
fn test_type_mismatch_at_aligned_position() {
    let (events, mut trace) = projected_and_trace();
    // Same task, same position, different lifecycle tag.
    trace.events[2].event_type = ProjectedType::Failed;

    let report = compare_trajectory(&events, &trace, &CompareOptions::default());
    assert_eq!(report.mismatch_count, 1);
    assert_eq!(report.top_anomalies[0].code, AnomalyCode::TypeMismatch);
    assert_eq!(report.top_anomalies[0].severity, Severity::Error);
}

#[test]
fn test_order_mismatch_beyond_window() {
    // Build a long projected stream; move one event's local peer far out of
    // the alignment window.
    let mut inputs = Vec::new();
    for i in 0..24u8 {
        inputs.push(chainreplay_testing::raw_event(
            "task_created",
            2 + i as u64,
            &format!("SIG_{:02}", i),
            i as u64,
            json!({
                "task_id": chainreplay_testing::bytes32(i + 1),
                "creator": chainreplay_testing::bytes32(0xA1),
                "reward": 1u64,
            }),
        ));
    }
    let output = project(
        &inputs,
        &ProjectionOptions {
            mode: ProjectionMode::Lenient,
            trace_id: Some("order-trace".to_string()),
            seed: 12,
            created_at_ms: 0,
        },
    )
    .unwrap();
    let mut trace = TrajectoryTrace::from_projection(&output.trace);

    // Rotate the first local event to the back: its projected peer now sits
    // more than W positions away.
    let first = trace.events.remove(0);
    trace.events.push(first);

    let report = compare_trajectory(&output.events, &trace, &CompareOptions::default());
    assert!(report
        .top_anomalies
        .iter()
        .any(|a| a.code == AnomalyCode::OrderMismatch));
}

#[test]
fn test_strict_mode_elevates_warnings() {
    let (events, mut trace) = projected_and_trace();
    trace.events[0].payload["reward"] = json!(1u64);

    let lenient = compare_trajectory(&events, &trace, &CompareOptions::default());
    assert_eq!(lenient.top_anomalies[0].severity, Severity::Warning);

    let strict = compare_trajectory(
        &events,
        &trace,
        &CompareOptions {
            strictness: Strictness::Strict,
            redact_fields: Vec::new(),
        },
    );
    assert_eq!(strict.top_anomalies[0].severity, Severity::Error);
    // Elevation does not change identity.
    assert_eq!(lenient.anomaly_ids, strict.anomaly_ids);
}

#[test]
fn test_redaction_strips_fields_from_reports() {
    let (events, mut trace) = projected_and_trace();
    trace.events[0].payload["reward"] = json!(2u64);

    let report = compare_trajectory(
        &events,
        &trace,
        &CompareOptions {
            strictness: Strictness::Lenient,
            redact_fields: vec!["creator".to_string()],
        },
    );
    assert!(report.redactions_applied > 0);
    for anomaly in &report.top_anomalies {
        if let Some(payload) = &anomaly.projected_payload {
            assert!(payload.get("creator").is_none());
        }
    }
}

#[test]
fn test_comparison_ignores_projected_input_order() {
    let (mut events, trace) = projected_and_trace();
    events.reverse();
    let report = compare_trajectory(&events, &trace, &CompareOptions::default());
    assert_eq!(report.status, CompareStatus::Clean);
}
