use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::hash::anomaly_id;

/// Severity tier shared by anomalies and alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Divergence classification emitted by the comparison service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyCode {
    MissingEvent,
    UnexpectedEvent,
    PayloadMismatch,
    TypeMismatch,
    OrderMismatch,
}

impl AnomalyCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyCode::MissingEvent => "missing_event",
            AnomalyCode::UnexpectedEvent => "unexpected_event",
            AnomalyCode::PayloadMismatch => "payload_mismatch",
            AnomalyCode::TypeMismatch => "type_mismatch",
            AnomalyCode::OrderMismatch => "order_mismatch",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_pda: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispute_pda: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_event_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampled: Option<bool>,
}

impl AnomalyContext {
    fn identity_value(&self) -> Value {
        let mut map = Map::new();
        if let Some(seq) = self.seq {
            map.insert("seq".to_string(), Value::from(seq));
        }
        for (key, field) in [
            ("task_pda", &self.task_pda),
            ("dispute_pda", &self.dispute_pda),
            ("source_event_name", &self.source_event_name),
            ("signature", &self.signature),
            ("trace_id", &self.trace_id),
            ("event_type", &self.event_type),
        ] {
            if let Some(v) = field {
                map.insert(key.to_string(), Value::from(v.clone()));
            }
        }
        if let Some(sampled) = self.sampled {
            map.insert("sampled".to_string(), Value::from(sampled));
        }
        Value::Object(map)
    }
}

/// A classified divergence between a local trajectory and the projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayAnomaly {
    pub anomaly_id: String,
    pub code: AnomalyCode,
    pub severity: Severity,
    pub message: String,
    pub context: AnomalyContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projected_payload: Option<Value>,
}

impl ReplayAnomaly {
    /// Build an anomaly with its deterministic ID. The ID excludes
    /// `severity`, the only field strict-mode elevation mutates.
    pub fn new(
        code: AnomalyCode,
        severity: Severity,
        message: impl Into<String>,
        context: AnomalyContext,
        local_payload: Option<Value>,
        projected_payload: Option<Value>,
    ) -> Self {
        let message = message.into();
        let mut identity = Map::new();
        identity.insert("code".to_string(), Value::from(code.as_str()));
        identity.insert("message".to_string(), Value::from(message.clone()));
        identity.insert("context".to_string(), context.identity_value());
        if let Some(local) = &local_payload {
            identity.insert("local_payload".to_string(), local.clone());
        }
        if let Some(projected) = &projected_payload {
            identity.insert("projected_payload".to_string(), projected.clone());
        }
        let anomaly_id = anomaly_id(&Value::Object(identity));
        Self {
            anomaly_id,
            code,
            severity,
            message,
            context,
            local_payload,
            projected_payload,
        }
    }
}
