use serde_json::Value;

use chainreplay_types::{
    events_hash, hash_canonical, sha256_hex, tool_fingerprint, EvidenceManifest, EvidencePack,
    IncidentCase, IntegrityReport, ProjectedTimelineEvent, RedactionPolicy, SlotCursor,
};

use super::event_to_value;

#[derive(Debug, Clone)]
pub struct EvidenceOptions {
    pub sealed: bool,
    pub policy: RedactionPolicy,
    pub seed: Option<u64>,
    pub tool_version: String,
}

impl Default for EvidenceOptions {
    fn default() -> Self {
        Self {
            sealed: false,
            policy: RedactionPolicy::default(),
            seed: None,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Assemble an evidence pack for a case and its windowed events.
///
/// Sealing is single-shot: redaction runs here or never, and the manifest
/// hashes are computed over the sealed content so a sealed pack verifies
/// as-is. `query` is the original filter the window was read with.
pub fn build_evidence_pack(
    case: &IncidentCase,
    events: &[ProjectedTimelineEvent],
    query: &Value,
    options: &EvidenceOptions,
) -> serde_json::Result<EvidencePack> {
    let mut case_value = serde_json::to_value(case)?;
    let mut event_values: Vec<Value> = events.iter().map(event_to_value).collect();

    if options.sealed {
        seal_values(&mut case_value, &mut event_values, &options.policy);
    }

    let manifest = EvidenceManifest {
        schema_version: EvidenceManifest::SCHEMA_VERSION,
        query_hash: hash_canonical(query),
        case_hash: hash_canonical(&case_value),
        events_hash: events_hash(&event_values),
        sealed: options.sealed,
        slot_cursor: SlotCursor {
            start: case.trace_window.from_slot,
            end: case.trace_window.to_slot,
        },
        seed: options.seed,
        tool_fingerprint: tool_fingerprint(&options.tool_version),
    };

    Ok(EvidencePack {
        manifest,
        case_data: case_value,
        events: event_values,
    })
}

/// Apply a redaction policy to case data and events in place. Irreversible.
pub fn seal_values(case: &mut Value, events: &mut [Value], policy: &RedactionPolicy) {
    if let Some(n) = policy.truncate_actor_keys {
        truncate_actor_keys(case, n);
    }
    redact_value(case, policy);
    for event in events {
        redact_value(event, policy);
    }
}

fn redact_value(value: &mut Value, policy: &RedactionPolicy) {
    match value {
        Value::Object(map) => {
            for field in &policy.remove_fields {
                map.remove(field);
            }
            for field in &policy.mask_fields {
                if let Some(slot) = map.get_mut(field) {
                    *slot = Value::from("[MASKED]");
                }
            }
            if policy.hash_signatures
                && let Some(slot) = map.get_mut("signature")
                && let Some(signature) = slot.as_str()
            {
                *slot = Value::from(format!(
                    "[REDACTED:{}]",
                    &sha256_hex(signature.as_bytes())[..16]
                ));
            }
            for child in map.values_mut() {
                redact_value(child, policy);
            }
        }
        Value::Array(items) => {
            for child in items {
                redact_value(child, policy);
            }
        }
        _ => {}
    }
}

fn truncate_actor_keys(case: &mut Value, n: usize) {
    let Some(actor_map) = case.get_mut("actor_map").and_then(|v| v.as_array_mut()) else {
        return;
    };
    for entry in actor_map {
        let Some(slot) = entry.get_mut("pubkey") else {
            continue;
        };
        if let Some(pubkey) = slot.as_str()
            && pubkey.len() > n
        {
            *slot = Value::from(format!("{}...", &pubkey[..n]));
        }
    }
}

/// Recompute both content hashes and report every mismatch. Tamper
/// detection is total: any byte change in `case_data` or `events` flips the
/// corresponding check.
pub fn verify_evidence_pack_integrity(pack: &EvidencePack) -> IntegrityReport {
    let mut errors = Vec::new();

    if hash_canonical(&pack.case_data) != pack.manifest.case_hash {
        errors.push("Case hash mismatch".to_string());
    }
    if events_hash(&pack.events) != pack.manifest.events_hash {
        errors.push("Events hash mismatch".to_string());
    }

    IntegrityReport {
        valid: errors.is_empty(),
        errors,
    }
}
