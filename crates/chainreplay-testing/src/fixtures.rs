use chainreplay_types::RawOnChainEvent;
use serde_json::{json, Value};

/// Seed carried by the chaos fixture's trace.
pub const CHAOS_SEED: u64 = 777;

/// Base timestamp for fixture events; slots map to one second each.
pub const FIXTURE_EPOCH_MS: i64 = 1_700_000_000_000;

pub fn fixture_timestamp(slot: u64) -> i64 {
    FIXTURE_EPOCH_MS + slot as i64 * 1_000
}

/// A 32-byte identifier as the RPC decoder ships it: a JSON byte array.
pub fn bytes32(fill: u8) -> Value {
    json!(vec![fill; 32])
}

pub fn raw_event(
    event_name: &str,
    slot: u64,
    signature: &str,
    source_event_sequence: u64,
    event: Value,
) -> RawOnChainEvent {
    RawOnChainEvent {
        event_name: event_name.to_string(),
        slot,
        signature: signature.to_string(),
        timestamp_ms: fixture_timestamp(slot),
        source_event_sequence,
        event,
    }
}

/// Scenario: one task created, claimed and completed cleanly.
///
/// Projects to `[discovered, claimed, completed]` with untouched telemetry.
pub fn clean_task_fixture() -> Vec<RawOnChainEvent> {
    vec![
        raw_event(
            "task_created",
            2,
            "SIG_CREATE",
            0,
            json!({
                "task_id": bytes32(0x01),
                "creator": bytes32(0xA1),
                "reward": 5_000u64,
            }),
        ),
        raw_event(
            "task_claimed",
            4,
            "SIG_CLAIM",
            1,
            json!({
                "task_id": bytes32(0x01),
                "worker": bytes32(0xB2),
                "bond": 500u64,
            }),
        ),
        raw_event(
            "task_completed",
            5,
            "SIG_COMPLETE",
            2,
            json!({
                "task_id": bytes32(0x01),
                "worker": bytes32(0xB2),
                "result_hash": bytes32(0x0F),
            }),
        ),
    ]
}

/// The chaos stream: two tasks, one dispute, one speculation chain, plus a
/// duplicate, a malformed record and an unknown event.
///
/// Lenient projection yields exactly 8 events with type sequence
/// `[discovered, discovered, claimed, completed, dispute:initiated,
/// speculation_started, speculation_confirmed, speculation_aborted]` and
/// telemetry `{projected: 8, duplicates: 1, malformed: 1, unknown: 1,
/// transition_conflicts: 2, transition_violations: 1}`:
/// - `task_completed` for an unclaimed task is the violation
/// - the dispute against the already-completed task blocks the parallel
///   `disputed` projection (first conflict)
/// - `bond_slashed` after `bond_released` is the second conflict
///
/// Strict projection fails on the malformed record with
/// `task:task_created@SIG_MALFORMED: missing_field: task_id`.
pub fn chaos_fixture() -> Vec<RawOnChainEvent> {
    let task_one = bytes32(0x01);
    let task_two = bytes32(0x02);
    let completed = raw_event(
        "task_completed",
        5,
        "SIG_T1_COMPLETE",
        3,
        json!({
            "task_id": task_one.clone(),
            "worker": bytes32(0xB2),
        }),
    );

    vec![
        raw_event(
            "task_created",
            2,
            "SIG_T1_CREATE",
            0,
            json!({
                "task_id": task_one.clone(),
                "creator": bytes32(0xA1),
                "reward": 9_000u64,
            }),
        ),
        raw_event(
            "dependent_task_created",
            3,
            "SIG_T2_CREATE",
            1,
            json!({
                "task_id": task_two.clone(),
                "parent_task_id": task_one.clone(),
                "creator": bytes32(0xA1),
                "reward": 3_000u64,
            }),
        ),
        raw_event(
            "task_claimed",
            4,
            "SIG_T2_CLAIM",
            2,
            json!({
                "task_id": task_two.clone(),
                "worker": bytes32(0xB2),
            }),
        ),
        completed.clone(),
        // Exact duplicate of the completion: same (slot, signature, name).
        completed,
        raw_event(
            "task_created",
            6,
            "SIG_MALFORMED",
            5,
            json!({
                "creator": bytes32(0xA1),
                "reward": 1u64,
            }),
        ),
        raw_event(
            "dispute_initiated",
            7,
            "SIG_DISPUTE",
            6,
            json!({
                "dispute_id": bytes32(0x99),
                "task_id": task_one,
                "initiator": bytes32(0xC3),
                "defendant": bytes32(0xB2),
                "stake": 700u64,
            }),
        ),
        raw_event(
            "speculative_commitment_created",
            8,
            "SIG_SPEC_START",
            7,
            json!({
                "task_id": task_two.clone(),
                "commitment": bytes32(0x77),
                "producer": bytes32(0xD4),
                "bond": 250u64,
            }),
        ),
        raw_event(
            "bond_released",
            9,
            "SIG_SPEC_CONFIRM",
            8,
            json!({
                "task_id": task_two.clone(),
                "recipient": bytes32(0xD4),
                "amount": 250u64,
            }),
        ),
        raw_event(
            "bond_slashed",
            10,
            "SIG_SPEC_ABORT",
            9,
            json!({
                "task_id": task_two,
                "treasury": bytes32(0xF6),
                "amount": 250u64,
            }),
        ),
        raw_event(
            "oracle_pulse",
            11,
            "SIG_UNKNOWN",
            10,
            json!({"beacon": 42u64}),
        ),
    ]
}

/// A dispute lifecycle against a claimed task, exercising the dual
/// projection of `dispute_initiated`.
pub fn disputed_task_fixture() -> Vec<RawOnChainEvent> {
    vec![
        raw_event(
            "task_created",
            2,
            "SIG_CREATE",
            0,
            json!({
                "task_id": bytes32(0x01),
                "creator": bytes32(0xA1),
                "reward": 5_000u64,
            }),
        ),
        raw_event(
            "task_claimed",
            3,
            "SIG_CLAIM",
            1,
            json!({
                "task_id": bytes32(0x01),
                "worker": bytes32(0xB2),
            }),
        ),
        raw_event(
            "dispute_initiated",
            5,
            "SIG_DISPUTE",
            2,
            json!({
                "dispute_id": bytes32(0x99),
                "task_id": bytes32(0x01),
                "initiator": bytes32(0xC3),
                "stake": 700u64,
            }),
        ),
        raw_event(
            "dispute_vote_cast",
            6,
            "SIG_VOTE_1",
            3,
            json!({
                "dispute_id": bytes32(0x99),
                "voter": bytes32(0xE5),
                "supports_initiator": true,
                "weight": 10u64,
            }),
        ),
        raw_event(
            "dispute_resolved",
            8,
            "SIG_RESOLVE",
            4,
            json!({
                "dispute_id": bytes32(0x99),
                "task_id": bytes32(0x01),
                "winner": bytes32(0xC3),
                "slashed_amount": 350u64,
            }),
        ),
    ]
}
