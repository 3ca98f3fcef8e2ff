use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::canonical::canonical_stringify;
use crate::event::ProjectedTimelineEvent;

/// SHA-256 over raw bytes, rendered as 64 lowercase hex chars.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// SHA-256 over the canonical serialization of a JSON value.
pub fn hash_canonical(value: &Value) -> String {
    sha256_hex(canonical_stringify(value).as_bytes())
}

/// Projection hash of a timeline event: SHA-256 over the canonical
/// serialization of every field except the hash itself. Computed after the
/// dense `seq` has been assigned, so the hash pins the event's final position.
pub fn projection_hash(event: &ProjectedTimelineEvent) -> String {
    let mut map = Map::new();
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
    hash_canonical(&Value::Object(map))
}

/// Hash over an ordered list of JSON-rendered events (evidence packs,
/// determinism checks).
pub fn events_hash(events: &[Value]) -> String {
    hash_canonical(&Value::Array(events.to_vec()))
}

/// Deterministic incident case ID: first 32 hex chars of the SHA-256 over
/// the case window and its sorted participant IDs.
pub fn case_id(
    from_slot: u64,
    to_slot: u64,
    task_ids: &[String],
    dispute_ids: &[String],
) -> String {
    let mut tasks = task_ids.to_vec();
    tasks.sort();
    let mut disputes = dispute_ids.to_vec();
    disputes.sort();

    let mut map = Map::new();
    map.insert("from_slot".to_string(), Value::from(from_slot));
    map.insert("to_slot".to_string(), Value::from(to_slot));
    map.insert(
        "task_ids".to_string(),
        Value::Array(tasks.into_iter().map(Value::from).collect()),
    );
    map.insert(
        "dispute_ids".to_string(),
        Value::Array(disputes.into_iter().map(Value::from).collect()),
    );
    hash_canonical(&Value::Object(map))[..32].to_string()
}

/// Anomaly ID: first 16 hex chars of the SHA-256 over a pre-assembled
/// identity view of the anomaly.
pub fn anomaly_id(identity: &Value) -> String {
    hash_canonical(identity)[..16].to_string()
}

/// Fingerprint of the tool build that produced an artifact.
pub fn tool_fingerprint(version: &str) -> String {
    sha256_hex(format!("chainreplay:{}", version).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sha256_hex_known_vector() {
        // SHA-256 of the empty string.
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_case_id_independent_of_input_order() {
        let a = case_id(
            1,
            9,
            &["t2".to_string(), "t1".to_string()],
            &["d1".to_string()],
        );
        let b = case_id(
            1,
            9,
            &["t1".to_string(), "t2".to_string()],
            &["d1".to_string()],
        );
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_case_id_sensitive_to_window() {
        let a = case_id(1, 9, &["t1".to_string()], &[]);
        let b = case_id(1, 10, &["t1".to_string()], &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_anomaly_id_length() {
        let id = anomaly_id(&json!({"code": "missing_event", "seq": 3}));
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tool_fingerprint_is_stable() {
        assert_eq!(tool_fingerprint("0.2.0"), tool_fingerprint("0.2.0"));
        assert_ne!(tool_fingerprint("0.2.0"), tool_fingerprint("0.2.1"));
    }
}
