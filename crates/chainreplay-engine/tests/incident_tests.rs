use chainreplay_engine::{
    build_evidence_pack, build_incident_case, project, verify_evidence_pack_integrity,
    EvidenceOptions, IncidentInput, ProjectionMode, ProjectionOptions,
};
use chainreplay_testing::{chaos_fixture, clean_task_fixture, disputed_task_fixture, CHAOS_SEED};
use chainreplay_types::{
    ActorRole, CaseStatus, EntityKind, ProjectedTimelineEvent, RedactionPolicy, SlotWindow,
};
use serde_json::json;

fn project_events(inputs: &[chainreplay_types::RawOnChainEvent], seed: u64) -> Vec<ProjectedTimelineEvent> {
    project(
        inputs,
        &ProjectionOptions {
            mode: ProjectionMode::Lenient,
            trace_id: Some("incident-trace".to_string()),
            seed,
            created_at_ms: 0,
        },
    )
    .unwrap()
    .events
}

fn case_input(events: &[ProjectedTimelineEvent]) -> IncidentInput<'_> {
    IncidentInput {
        events,
        anomalies: &[],
        window: None,
        metadata: None,
        created_at_ms: 1_700_000_500_000,
    }
}

#[test]
fn test_clean_case_transitions_and_status() {
    let events = project_events(&clean_task_fixture(), 21);
    let case = build_incident_case(&case_input(&events));

    assert_eq!(case.schema_version, 1);
    assert_eq!(case.trace_window.from_slot, 2);
    assert_eq!(case.trace_window.to_slot, 5);
    assert_eq!(case.case_id.len(), 32);

    let tos: Vec<&str> = case.transitions.iter().map(|t| t.to.as_str()).collect();
    assert_eq!(tos, vec!["discovered", "claimed", "completed"]);
    assert!(case.transitions.iter().all(|t| t.valid));
    assert_eq!(case.case_status, CaseStatus::Resolved);
    assert_eq!(case.task_ids.len(), 1);
    assert!(case.dispute_ids.is_empty());
}

#[test]
fn test_case_id_deterministic_and_window_sensitive() {
    let events = project_events(&clean_task_fixture(), 21);
    let a = build_incident_case(&case_input(&events));
    let b = build_incident_case(&case_input(&events));
    assert_eq!(a.case_id, b.case_id);

    let narrowed = build_incident_case(&IncidentInput {
        window: Some(SlotWindow {
            from_slot: Some(4),
            to_slot: None,
        }),
        ..case_input(&events)
    });
    assert_ne!(a.case_id, narrowed.case_id);
    assert_eq!(narrowed.trace_window.from_slot, 4);
}

#[test]
fn test_window_overrides_clamp_to_observed_range() {
    let events = project_events(&clean_task_fixture(), 21);
    let case = build_incident_case(&IncidentInput {
        window: Some(SlotWindow {
            from_slot: Some(0),
            to_slot: Some(99_999),
        }),
        ..case_input(&events)
    });
    assert_eq!(case.trace_window.from_slot, 2);
    assert_eq!(case.trace_window.to_slot, 5);
}

#[test]
fn test_empty_events_yield_zero_window() {
    let case = build_incident_case(&case_input(&[]));
    assert_eq!(case.trace_window.from_slot, 0);
    assert_eq!(case.trace_window.to_slot, 0);
    assert_eq!(case.case_status, CaseStatus::Resolved);
    assert!(case.transitions.is_empty());
}

#[test]
fn test_dispute_case_tracks_parallel_task_transition() {
    let events = project_events(&disputed_task_fixture(), 22);
    let case = build_incident_case(&case_input(&events));

    let task_transitions: Vec<&str> = case
        .transitions
        .iter()
        .filter(|t| t.entity_kind == EntityKind::Task)
        .map(|t| t.to.as_str())
        .collect();
    assert_eq!(task_transitions, vec!["discovered", "claimed", "disputed"]);

    let dispute_transitions: Vec<&str> = case
        .transitions
        .iter()
        .filter(|t| t.entity_kind == EntityKind::Dispute)
        .map(|t| t.to.as_str())
        .collect();
    assert_eq!(dispute_transitions, vec!["open", "vote_cast", "resolved"]);

    // Task ends disputed (non-terminal): the case stays open.
    assert_eq!(case.case_status, CaseStatus::Open);
    assert_eq!(case.dispute_ids.len(), 1);
}

#[test]
fn test_chaos_case_flags_invalid_transitions() {
    let events = project_events(&chaos_fixture(), CHAOS_SEED);
    let case = build_incident_case(&case_input(&events));

    assert!(case.transitions.iter().any(|t| !t.valid));
    assert_eq!(case.case_status, CaseStatus::Flagged);
    assert_eq!(case.task_ids.len(), 2);

    let speculation: Vec<&str> = case
        .transitions
        .iter()
        .filter(|t| t.entity_kind == EntityKind::Speculation)
        .map(|t| t.to.as_str())
        .collect();
    assert_eq!(speculation, vec!["started", "confirmed", "aborted"]);
}

#[test]
fn test_actor_map_roles_and_ordering() {
    let events = project_events(&disputed_task_fixture(), 23);
    let case = build_incident_case(&case_input(&events));

    let creator = chainreplay_types::to_base58(&[0xA1; 32]);
    let worker = chainreplay_types::to_base58(&[0xB2; 32]);
    let voter = chainreplay_types::to_base58(&[0xE5; 32]);

    let find = |key: &str| case.actor_map.iter().find(|a| a.pubkey == key);
    assert_eq!(find(&creator).unwrap().role, ActorRole::Creator);
    assert_eq!(find(&worker).unwrap().role, ActorRole::Worker);
    assert_eq!(find(&voter).unwrap().role, ActorRole::Arbiter);

    // Ordered by first appearance, then key.
    let mut sorted = case.actor_map.clone();
    sorted.sort_by(|a, b| (a.first_seen_seq, &a.pubkey).cmp(&(b.first_seen_seq, &b.pubkey)));
    assert_eq!(case.actor_map, sorted);
    assert_eq!(find(&creator).unwrap().first_seen_seq, 1);
}

#[test]
fn test_actor_role_priority_wins() {
    // The same key appears as worker (early) and creator (later): the
    // creator role has higher priority and must win, while first_seen_seq
    // keeps the earliest sighting.
    let same_key = chainreplay_testing::bytes32(0x5A);
    let inputs = vec![
        chainreplay_testing::raw_event(
            "task_created",
            2,
            "SIG_A",
            0,
            json!({"task_id": chainreplay_testing::bytes32(1), "creator": chainreplay_testing::bytes32(0xA1), "reward": 1u64}),
        ),
        chainreplay_testing::raw_event(
            "task_claimed",
            3,
            "SIG_B",
            1,
            json!({"task_id": chainreplay_testing::bytes32(1), "worker": same_key.clone()}),
        ),
        chainreplay_testing::raw_event(
            "task_created",
            4,
            "SIG_C",
            2,
            json!({"task_id": chainreplay_testing::bytes32(2), "creator": same_key, "reward": 2u64}),
        ),
    ];
    let events = project_events(&inputs, 24);
    let case = build_incident_case(&case_input(&events));

    let key = chainreplay_types::to_base58(&[0x5A; 32]);
    let entry = case.actor_map.iter().find(|a| a.pubkey == key).unwrap();
    assert_eq!(entry.role, ActorRole::Creator);
    assert_eq!(entry.first_seen_seq, 2);
}

#[test]
fn test_evidence_pack_round_trip_unsealed() {
    let events = project_events(&clean_task_fixture(), 25);
    let case = build_incident_case(&case_input(&events));
    let pack = build_evidence_pack(
        &case,
        &events,
        &json!({"task_pda": case.task_ids[0]}),
        &EvidenceOptions::default(),
    )
    .unwrap();

    assert!(!pack.manifest.sealed);
    assert_eq!(pack.manifest.slot_cursor.start, 2);
    assert_eq!(pack.manifest.slot_cursor.end, 5);
    assert_eq!(pack.events.len(), 3);

    let report = verify_evidence_pack_integrity(&pack);
    assert!(report.valid, "errors: {:?}", report.errors);
}

#[test]
fn test_sealed_pack_redacts_and_still_verifies() {
    let events = project_events(&clean_task_fixture(), 26);
    let case = build_incident_case(&case_input(&events));
    let pack = build_evidence_pack(
        &case,
        &events,
        &json!({}),
        &EvidenceOptions {
            sealed: true,
            policy: RedactionPolicy {
                remove_fields: vec!["private_key".to_string()],
                mask_fields: vec!["result_hash".to_string()],
                truncate_actor_keys: Some(8),
                hash_signatures: true,
            },
            seed: Some(CHAOS_SEED),
            tool_version: "0.2.0".to_string(),
        },
    )
    .unwrap();

    assert!(pack.manifest.sealed);
    assert_eq!(pack.manifest.seed, Some(CHAOS_SEED));

    // Every signature in the pack is hashed out.
    for event in &pack.events {
        let signature = event["signature"].as_str().unwrap();
        assert!(
            signature.starts_with("[REDACTED:") && signature.ends_with(']'),
            "unredacted signature: {}",
            signature
        );
        // The redaction also reaches nested payload blocks.
        let nested = event["payload"]["onchain"]["signature"].as_str().unwrap();
        assert!(nested.starts_with("[REDACTED:"));
    }

    // Masked field, truncated actor keys.
    let completed = pack
        .events
        .iter()
        .find(|e| e["type"] == "completed")
        .unwrap();
    assert_eq!(completed["payload"]["result_hash"], "[MASKED]");

    for actor in pack.case_data["actor_map"].as_array().unwrap() {
        let pubkey = actor["pubkey"].as_str().unwrap();
        assert!(pubkey.len() <= 11, "untruncated actor key: {}", pubkey);
        assert!(pubkey.ends_with("..."));
    }

    // A sealed pack verifies as-is: hashes cover the sealed content.
    let report = verify_evidence_pack_integrity(&pack);
    assert!(report.valid, "errors: {:?}", report.errors);
}

#[test]
fn test_tampering_with_case_data_detected() {
    let events = project_events(&clean_task_fixture(), 27);
    let case = build_incident_case(&case_input(&events));
    let mut pack =
        build_evidence_pack(&case, &events, &json!({}), &EvidenceOptions::default()).unwrap();

    pack.case_data["case_status"] = json!("resolved_by_edit");
    let report = verify_evidence_pack_integrity(&pack);
    assert!(!report.valid);
    assert_eq!(report.errors, vec!["Case hash mismatch".to_string()]);
}

#[test]
fn test_tampering_with_events_detected() {
    let events = project_events(&clean_task_fixture(), 28);
    let case = build_incident_case(&case_input(&events));
    let mut pack =
        build_evidence_pack(&case, &events, &json!({}), &EvidenceOptions::default()).unwrap();

    pack.events[1]["payload"]["reward"] = json!(1u64);
    let report = verify_evidence_pack_integrity(&pack);
    assert!(!report.valid);
    assert_eq!(report.errors, vec!["Events hash mismatch".to_string()]);
}

#[test]
fn test_anomaly_refs_flow_into_case() {
    let events = project_events(&clean_task_fixture(), 29);
    let anomaly = chainreplay_types::ReplayAnomaly::new(
        chainreplay_types::AnomalyCode::PayloadMismatch,
        chainreplay_types::Severity::Warning,
        "payload differs at reward",
        chainreplay_types::AnomalyContext {
            seq: Some(1),
            ..Default::default()
        },
        None,
        None,
    );
    let case = build_incident_case(&IncidentInput {
        anomalies: std::slice::from_ref(&anomaly),
        ..case_input(&events)
    });

    assert_eq!(case.anomaly_ids, vec![anomaly.anomaly_id.clone()]);
    assert_eq!(case.anomalies[0].seq, Some(1));
    assert_eq!(case.case_status, CaseStatus::Flagged);
}
