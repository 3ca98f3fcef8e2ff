use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chainreplay_runtime::{AlertContext, AlertDispatcher, AlertDispatcherConfig};
use chainreplay_testing::{CollectingAdapter, FailingAdapter};
use chainreplay_types::{
    compute_anomaly_set_hash, validate_alert_schema, AlertKind, Severity,
};

fn context(code: &str, task_pda: Option<&str>, slot: Option<u64>) -> AlertContext {
    let mut context = AlertContext::new(
        code,
        Severity::Error,
        AlertKind::StoreWriteFailure,
        "store save failed",
    );
    context.task_pda = task_pda.map(|s| s.to_string());
    context.slot = slot;
    context
}

fn dispatcher(config: AlertDispatcherConfig, clock_ms: Arc<AtomicI64>) -> AlertDispatcher {
    AlertDispatcher::new(config).with_clock(move || clock_ms.load(Ordering::SeqCst))
}

#[tokio::test]
async fn test_dedupe_within_window() {
    let clock = Arc::new(AtomicI64::new(1_000));
    let mut dispatcher = dispatcher(AlertDispatcherConfig::default(), clock.clone());
    let (adapter, received) = CollectingAdapter::new();
    dispatcher.add_adapter(Box::new(adapter));

    let first = dispatcher
        .emit(context("replay.backfill.store_write_failed", Some("t1"), Some(5)))
        .await;
    assert!(first.is_some());

    clock.store(1_500, Ordering::SeqCst);
    let second = dispatcher
        .emit(context("replay.backfill.store_write_failed", Some("t1"), Some(5)))
        .await;
    assert!(second.is_none());

    // Exactly one adapter invocation for the pair.
    assert_eq!(received.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_reemission_after_window_carries_repeat_count() {
    let clock = Arc::new(AtomicI64::new(0));
    let mut dispatcher = dispatcher(
        AlertDispatcherConfig {
            dedupe_window_ms: 1_000,
            ..Default::default()
        },
        clock.clone(),
    );
    let (adapter, received) = CollectingAdapter::new();
    dispatcher.add_adapter(Box::new(adapter));

    assert!(dispatcher.emit(context("c", Some("t1"), None)).await.is_some());
    for _ in 0..3 {
        clock.fetch_add(10, Ordering::SeqCst);
        assert!(dispatcher.emit(context("c", Some("t1"), None)).await.is_none());
    }

    clock.store(5_000, Ordering::SeqCst);
    let reemitted = dispatcher
        .emit(context("c", Some("t1"), None))
        .await
        .unwrap();
    assert_eq!(reemitted.repeat_count, 3);
    assert_eq!(received.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_distinct_scopes_are_not_deduped() {
    let clock = Arc::new(AtomicI64::new(0));
    let mut dispatcher = dispatcher(AlertDispatcherConfig::default(), clock);
    let (adapter, received) = CollectingAdapter::new();
    dispatcher.add_adapter(Box::new(adapter));

    assert!(dispatcher.emit(context("c", Some("t1"), Some(5))).await.is_some());
    assert!(dispatcher.emit(context("c", Some("t2"), Some(5))).await.is_some());
    assert!(dispatcher.emit(context("c", Some("t1"), Some(6))).await.is_some());
    assert_eq!(received.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_disabled_or_unrouted_returns_none() {
    let mut disabled = AlertDispatcher::disabled();
    assert!(disabled.emit(context("c", None, None)).await.is_none());

    // Enabled but no adapters wired.
    let mut unrouted = AlertDispatcher::new(AlertDispatcherConfig::default());
    assert!(unrouted.emit(context("c", None, None)).await.is_none());
}

#[tokio::test]
async fn test_adapter_failure_is_swallowed() {
    let clock = Arc::new(AtomicI64::new(0));
    let mut dispatcher = dispatcher(AlertDispatcherConfig::default(), clock);
    dispatcher.add_adapter(Box::new(FailingAdapter));
    let (adapter, received) = CollectingAdapter::new();
    dispatcher.add_adapter(Box::new(adapter));

    // The failing first adapter does not stop the second.
    let alert = dispatcher.emit(context("c", Some("t1"), None)).await;
    assert!(alert.is_some());
    assert_eq!(received.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_dedupe_map_is_bounded() {
    let clock = Arc::new(AtomicI64::new(0));
    let mut dispatcher = dispatcher(
        AlertDispatcherConfig {
            max_tracked_dedupe_keys: 8,
            ..Default::default()
        },
        clock,
    );
    let (adapter, _received) = CollectingAdapter::new();
    dispatcher.add_adapter(Box::new(adapter));

    for i in 0..50u64 {
        dispatcher
            .emit(context("c", Some(&format!("t{}", i)), None))
            .await;
    }
    assert!(dispatcher.tracked_keys() <= 8);
}

#[tokio::test]
async fn test_emitted_alert_passes_schema_validation() {
    let clock = Arc::new(AtomicI64::new(42_000));
    let mut dispatcher = dispatcher(AlertDispatcherConfig::default(), clock);
    let (adapter, _received) = CollectingAdapter::new();
    dispatcher.add_adapter(Box::new(adapter));

    let alert = dispatcher
        .emit(context("replay.backfill.ingestion_lag", Some("t1"), Some(9)))
        .await
        .unwrap();
    assert_eq!(alert.id, alert.compute_id());
    assert_eq!(alert.emitted_at_ms, 42_000);

    let value = serde_json::to_value(&alert).unwrap();
    let report = validate_alert_schema(&value);
    assert!(report.compatible, "report: {:?}", report);

    let set_hash = compute_anomaly_set_hash(std::slice::from_ref(&alert));
    assert_eq!(set_hash.len(), 64);
}
