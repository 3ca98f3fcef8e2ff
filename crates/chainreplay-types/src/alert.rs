use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::anomaly::Severity;
use crate::canonical::canonical_stringify;
use crate::hash::sha256_hex;

/// Operational classification of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    ReplayHashMismatch,
    TransitionValidation,
    ReplayIngestionLag,
    StoreWriteFailure,
    PolicyViolation,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::ReplayHashMismatch => "replay_hash_mismatch",
            AlertKind::TransitionValidation => "transition_validation",
            AlertKind::ReplayIngestionLag => "replay_ingestion_lag",
            AlertKind::StoreWriteFailure => "store_write_failure",
            AlertKind::PolicyViolation => "policy_violation",
        }
    }

    pub const ALL: [AlertKind; 5] = [
        AlertKind::ReplayHashMismatch,
        AlertKind::TransitionValidation,
        AlertKind::ReplayIngestionLag,
        AlertKind::StoreWriteFailure,
        AlertKind::PolicyViolation,
    ];
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dispatched replay anomaly alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayAnomalyAlert {
    pub id: String,
    pub code: String,
    pub severity: Severity,
    pub kind: AlertKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_pda: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispute_pda: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_event_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_event_sequence: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurred_at_ms: Option<i64>,
    pub repeat_count: u64,
    pub emitted_at_ms: i64,
}

impl ReplayAnomalyAlert {
    /// Deterministic alert ID: SHA-256 over the alert payload minus
    /// `repeat_count` (and the ID slot itself).
    pub fn compute_id(&self) -> String {
        let mut map = Map::new();
        map.insert("code".to_string(), Value::from(self.code.clone()));
        map.insert("severity".to_string(), Value::from(self.severity.as_str()));
        map.insert("kind".to_string(), Value::from(self.kind.as_str()));
        map.insert("message".to_string(), Value::from(self.message.clone()));
        for (key, field) in [
            ("task_pda", &self.task_pda),
            ("dispute_pda", &self.dispute_pda),
            ("source_event_name", &self.source_event_name),
            ("signature", &self.signature),
            ("trace_id", &self.trace_id),
        ] {
            if let Some(v) = field {
                map.insert(key.to_string(), Value::from(v.clone()));
            }
        }
        if let Some(slot) = self.slot {
            map.insert("slot".to_string(), Value::from(slot));
        }
        if let Some(seq) = self.source_event_sequence {
            map.insert("source_event_sequence".to_string(), Value::from(seq));
        }
        if let Some(metadata) = &self.metadata {
            map.insert("metadata".to_string(), metadata.clone());
        }
        if let Some(occurred) = self.occurred_at_ms {
            map.insert("occurred_at_ms".to_string(), Value::from(occurred));
        }
        map.insert("emitted_at_ms".to_string(), Value::from(self.emitted_at_ms));
        sha256_hex(canonical_stringify(&Value::Object(map)).as_bytes())
    }
}

/// Result of checking an arbitrary JSON object against the alert contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSchemaReport {
    pub compatible: bool,
    pub schema_version: String,
    pub missing_fields: Vec<String>,
    pub invalid_fields: Vec<String>,
}

pub const ALERT_SCHEMA_VERSION: &str = "replay.alert.v1";

const REQUIRED_ALERT_FIELDS: [&str; 6] =
    ["id", "code", "severity", "kind", "message", "emitted_at_ms"];

const SEVERITIES: [&str; 3] = ["info", "warning", "error"];

/// Validate the required alert tuple and its enumerations.
pub fn validate_alert_schema(obj: &Value) -> AlertSchemaReport {
    let mut missing_fields = Vec::new();
    let mut invalid_fields = Vec::new();

    let map = match obj.as_object() {
        Some(map) => map,
        None => {
            return AlertSchemaReport {
                compatible: false,
                schema_version: ALERT_SCHEMA_VERSION.to_string(),
                missing_fields: REQUIRED_ALERT_FIELDS.iter().map(|s| s.to_string()).collect(),
                invalid_fields,
            };
        }
    };

    for field in REQUIRED_ALERT_FIELDS {
        match map.get(field) {
            None | Some(Value::Null) => missing_fields.push(field.to_string()),
            Some(value) => {
                let valid = match field {
                    "severity" => value
                        .as_str()
                        .is_some_and(|s| SEVERITIES.contains(&s)),
                    "kind" => value
                        .as_str()
                        .is_some_and(|s| AlertKind::ALL.iter().any(|k| k.as_str() == s)),
                    "emitted_at_ms" => value.is_i64() || value.is_u64(),
                    _ => value.is_string(),
                };
                if !valid {
                    invalid_fields.push(field.to_string());
                }
            }
        }
    }

    AlertSchemaReport {
        compatible: missing_fields.is_empty() && invalid_fields.is_empty(),
        schema_version: ALERT_SCHEMA_VERSION.to_string(),
        missing_fields,
        invalid_fields,
    }
}

/// Order-insensitive hash over a set of alert IDs.
pub fn compute_anomaly_set_hash(alerts: &[ReplayAnomalyAlert]) -> String {
    let mut ids: Vec<String> = alerts.iter().map(|a| a.id.clone()).collect();
    ids.sort();
    let value = Value::Array(ids.into_iter().map(Value::from).collect());
    sha256_hex(canonical_stringify(&value).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_alert() -> ReplayAnomalyAlert {
        ReplayAnomalyAlert {
            id: String::new(),
            code: "replay.backfill.store_write_failed".to_string(),
            severity: Severity::Error,
            kind: AlertKind::StoreWriteFailure,
            message: "save failed".to_string(),
            task_pda: Some("t1".to_string()),
            dispute_pda: None,
            source_event_name: None,
            signature: None,
            slot: Some(7),
            source_event_sequence: None,
            trace_id: None,
            metadata: None,
            occurred_at_ms: None,
            repeat_count: 0,
            emitted_at_ms: 1_000,
        }
    }

    #[test]
    fn test_id_ignores_repeat_count() {
        let mut a = sample_alert();
        let mut b = sample_alert();
        b.repeat_count = 5;
        a.id = a.compute_id();
        b.id = b.compute_id();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_schema_validation_accepts_serialized_alert() {
        let mut alert = sample_alert();
        alert.id = alert.compute_id();
        let value = serde_json::to_value(&alert).unwrap();
        let report = validate_alert_schema(&value);
        assert!(report.compatible, "report: {:?}", report);
    }

    #[test]
    fn test_schema_validation_flags_missing_and_invalid() {
        let report = validate_alert_schema(&json!({
            "id": "abc",
            "code": "x",
            "severity": "catastrophic",
            "kind": "store_write_failure",
            "emitted_at_ms": 1,
        }));
        assert!(!report.compatible);
        assert_eq!(report.missing_fields, vec!["message".to_string()]);
        assert_eq!(report.invalid_fields, vec!["severity".to_string()]);
    }

    #[test]
    fn test_anomaly_set_hash_order_insensitive() {
        let mut a = sample_alert();
        a.id = "aaaa".to_string();
        let mut b = sample_alert();
        b.id = "bbbb".to_string();
        assert_eq!(
            compute_anomaly_set_hash(&[a.clone(), b.clone()]),
            compute_anomaly_set_hash(&[b, a])
        );
    }
}
