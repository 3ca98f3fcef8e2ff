use chainreplay_store::{
    Error, MemoryTimelineStore, SqliteTimelineStore, TimelineFilter, TimelineStore,
};
use chainreplay_types::{
    projection_hash, ProjectedTimelineEvent, ProjectedType, ReplayEventCursor,
    ReplayTimelineRecord,
};
use serde_json::json;

fn record(
    seq: u64,
    slot: u64,
    signature: &str,
    event_type: ProjectedType,
    task_pda: Option<&str>,
) -> ReplayTimelineRecord {
    let mut event = ProjectedTimelineEvent {
        seq,
        event_type,
        task_pda: task_pda.map(|s| s.to_string()),
        dispute_pda: None,
        slot,
        signature: signature.to_string(),
        source_event_name: "task_created".to_string(),
        source_event_sequence: 0,
        timestamp_ms: 1_000 + slot as i64,
        payload: json!({"task_id": task_pda, "reward": 10u64}),
        projection_hash: String::new(),
    };
    event.projection_hash = projection_hash(&event);
    ReplayTimelineRecord::from_event(event)
}

fn sample_records() -> Vec<ReplayTimelineRecord> {
    vec![
        record(1, 2, "sig-a", ProjectedType::Discovered, Some("t1")),
        record(2, 4, "sig-b", ProjectedType::Claimed, Some("t1")),
        record(3, 5, "sig-c", ProjectedType::Completed, Some("t1")),
        record(4, 6, "sig-d", ProjectedType::Discovered, Some("t2")),
    ]
}

fn run_suite(store: &mut dyn TimelineStore) {
    let records = sample_records();

    // Idempotent save: second write inserts nothing new.
    let first = store.save(&records).unwrap();
    assert_eq!(first.inserted, 4);
    assert_eq!(first.duplicates, 0);

    let second = store.save(&records).unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, 4);

    let all = store.query(&TimelineFilter::default()).unwrap();
    assert_eq!(all.len(), 4);
    let slots: Vec<u64> = all.iter().map(|r| r.event.slot).collect();
    assert_eq!(slots, vec![2, 4, 5, 6]);

    // Task filter
    let t1 = store
        .query(&TimelineFilter {
            task_pda: Some("t1".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(t1.len(), 3);

    // Slot window
    let windowed = store
        .query(&TimelineFilter {
            from_slot: Some(4),
            to_slot: Some(5),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(windowed.len(), 2);

    // Pagination cursor excludes everything at or before it.
    let paged = store
        .query(&TimelineFilter {
            cursor: Some(ReplayEventCursor::new(4, "sig-b")),
            ..Default::default()
        })
        .unwrap();
    let paged_slots: Vec<u64> = paged.iter().map(|r| r.event.slot).collect();
    assert_eq!(paged_slots, vec![5, 6]);

    // Limit
    let limited = store
        .query(&TimelineFilter {
            limit: Some(2),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(limited.len(), 2);

    // Stats
    let stats = store.stats().unwrap();
    assert_eq!(stats.event_count, 4);
    assert_eq!(stats.unique_task_count, 2);
    assert_eq!(stats.unique_dispute_count, 0);

    // Cursor persistence and monotonicity
    assert!(store.get_cursor().unwrap().is_none());
    store
        .save_cursor(Some(ReplayEventCursor::new(5, "sig-c")))
        .unwrap();
    assert_eq!(
        store.get_cursor().unwrap(),
        Some(ReplayEventCursor::new(5, "sig-c"))
    );

    // Equal cursor is fine, regressing is not.
    store
        .save_cursor(Some(ReplayEventCursor::new(5, "sig-c")))
        .unwrap();
    let regression = store.save_cursor(Some(ReplayEventCursor::new(4, "sig-b")));
    assert!(matches!(
        regression,
        Err(Error::CursorRegression { .. })
    ));
    assert_eq!(
        store.get_cursor().unwrap(),
        Some(ReplayEventCursor::new(5, "sig-c"))
    );

    // Clear wipes both records and cursor.
    store.clear().unwrap();
    assert!(store.query(&TimelineFilter::default()).unwrap().is_empty());
    assert!(store.get_cursor().unwrap().is_none());
}

#[test]
fn test_memory_store_suite() {
    let mut store = MemoryTimelineStore::new();
    run_suite(&mut store);
}

#[test]
fn test_sqlite_store_suite() {
    let mut store = SqliteTimelineStore::open_in_memory().unwrap();
    run_suite(&mut store);
}

#[test]
fn test_sqlite_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("timeline.db");

    {
        let mut store = SqliteTimelineStore::open(&db_path).unwrap();
        store.save(&sample_records()).unwrap();
        store
            .save_cursor(Some(ReplayEventCursor::new(6, "sig-d")))
            .unwrap();
    }

    let store = SqliteTimelineStore::open(&db_path).unwrap();
    let all = store.query(&TimelineFilter::default()).unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(
        store.get_cursor().unwrap(),
        Some(ReplayEventCursor::new(6, "sig-d"))
    );

    // Payload round-trips through canonical storage, hash included.
    for record in &all {
        assert_eq!(
            record.event.projection_hash,
            projection_hash(&record.event)
        );
    }
}

#[test]
fn test_dual_projection_records_do_not_collide() {
    // One raw dispute_initiated emits two projections in different
    // categories; both must land under the same (slot, signature).
    let mut dispute_event = ProjectedTimelineEvent {
        seq: 1,
        event_type: ProjectedType::DisputeInitiated,
        task_pda: Some("t1".to_string()),
        dispute_pda: Some("d1".to_string()),
        slot: 9,
        signature: "sig-x".to_string(),
        source_event_name: "dispute_initiated".to_string(),
        source_event_sequence: 0,
        timestamp_ms: 9_000,
        payload: json!({"dispute_id": "d1"}),
        projection_hash: String::new(),
    };
    dispute_event.projection_hash = projection_hash(&dispute_event);

    let mut task_event = dispute_event.clone();
    task_event.seq = 2;
    task_event.event_type = ProjectedType::Disputed;
    task_event.projection_hash = projection_hash(&task_event);

    let records = vec![
        ReplayTimelineRecord::from_event(dispute_event),
        ReplayTimelineRecord::from_event(task_event),
    ];

    let mut store = SqliteTimelineStore::open_in_memory().unwrap();
    let outcome = store.save(&records).unwrap();
    assert_eq!(outcome.inserted, 2);

    let stored = store.query(&TimelineFilter::default()).unwrap();
    assert_eq!(stored.len(), 2);

    let dispute_only = store
        .query(&TimelineFilter {
            source_event_type: Some("dispute".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(dispute_only.len(), 1);
    assert_eq!(
        dispute_only[0].event.event_type,
        ProjectedType::DisputeInitiated
    );
}
