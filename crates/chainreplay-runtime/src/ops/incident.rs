use serde_json::{json, Value};

use chainreplay_engine::{
    build_evidence_pack, build_incident_case, verify_evidence_pack_integrity, EvidenceOptions,
    IncidentInput,
};
use chainreplay_store::TimelineFilter;
use chainreplay_types::{
    canonical_stringify, IncidentCase, ProjectedTimelineEvent, RedactionPolicy,
};

use crate::envelope::error_envelope;
use crate::error::{Error, Result};
use crate::ops::{AuthContext, ToolRuntime};
use crate::policy::{check_access, resolve_actor, risk_level};

pub const COMMAND: &str = "replay.incident";
pub const SCHEMA: &str = "replay.incident.output.v1";

#[derive(Debug, Clone)]
pub struct IncidentParams {
    pub task_pda: Option<String>,
    pub dispute_pda: Option<String>,
    pub from_slot: Option<u64>,
    pub to_slot: Option<u64>,
    pub sealed: bool,
    pub max_payload_bytes: Option<usize>,
    pub redaction: RedactionPolicy,
    pub include_evidence: bool,
}

impl Default for IncidentParams {
    fn default() -> Self {
        Self {
            task_pda: None,
            dispute_pda: None,
            from_slot: None,
            to_slot: None,
            sealed: false,
            max_payload_bytes: None,
            redaction: RedactionPolicy::default(),
            include_evidence: true,
        }
    }
}

impl ToolRuntime {
    /// `replay.incident`: hash-stable case reconstruction over a projected
    /// window, with an optional (sealed) evidence pack. High-risk when the
    /// pack is emitted unsealed.
    pub fn incident(&mut self, params: &IncidentParams, auth: &AuthContext) -> Value {
        let started = self.now_ms();
        let actor = resolve_actor(auth.auth_client_id.as_deref(), auth.session_id.as_deref());
        let risk = risk_level("incident", Some(params.sealed));

        let outcome = self.run_incident(params, &actor, started);
        let (status, reason, violation_code) = match &outcome {
            Ok(_) => ("ok", None, None),
            Err(error) => (
                "error",
                Some(error.to_string()),
                Some(error.code().to_string()),
            ),
        };
        self.record_audit(
            COMMAND,
            &actor,
            &auth.request_id,
            status,
            started,
            reason,
            violation_code,
            risk,
            false,
        );

        match outcome {
            Ok(envelope) => envelope,
            Err(error) => error_envelope(COMMAND, SCHEMA, &error),
        }
    }

    fn run_incident(
        &mut self,
        params: &IncidentParams,
        actor: &crate::policy::Actor,
        started: i64,
    ) -> Result<Value> {
        check_access(&self.policy, "incident", actor, Some(params.sealed))?;

        if let (Some(from), Some(to)) = (params.from_slot, params.to_slot)
            && to.saturating_sub(from) > self.policy.max_slot_window
        {
            return Err(Error::LimitsExceeded(format!(
                "slot window {} exceeds max_slot_window {}",
                to - from,
                self.policy.max_slot_window
            )));
        }

        let filter = TimelineFilter {
            task_pda: params.task_pda.clone(),
            dispute_pda: params.dispute_pda.clone(),
            from_slot: params.from_slot,
            to_slot: params.to_slot,
            ..Default::default()
        };
        let records = self.store.query(&filter)?;

        let mut truncated = false;
        let mut truncation_reason: Option<&str> = None;

        let mut events: Vec<ProjectedTimelineEvent> =
            records.into_iter().map(|r| r.event).collect();
        if events.len() > self.policy.max_event_count {
            events.truncate(self.policy.max_event_count);
            truncated = true;
            truncation_reason = Some("max_event_count");
        }

        if let Some(cap) = params.max_payload_bytes {
            for event in &mut events {
                let rendered = canonical_stringify(&event.payload);
                if rendered.len() > cap {
                    event.payload = json!({
                        "payload_truncated": true,
                        "original_bytes": rendered.len(),
                    });
                    truncated = true;
                    truncation_reason = Some("max_payload_bytes");
                }
            }
        }

        let case = build_incident_case(&IncidentInput {
            events: &events,
            anomalies: &[],
            window: None,
            metadata: None,
            created_at_ms: started,
        });

        let (evidence_pack, validation) = if params.include_evidence {
            let query = serde_json::to_value(&filter)?;
            let pack = build_evidence_pack(
                &case,
                &events,
                &query,
                &EvidenceOptions {
                    sealed: params.sealed,
                    policy: params.redaction.clone(),
                    seed: None,
                    tool_version: env!("CARGO_PKG_VERSION").to_string(),
                },
            )?;
            let report = verify_evidence_pack_integrity(&pack);
            (Some(serde_json::to_value(&pack)?), json!(report))
        } else {
            (None, json!({"valid": true, "errors": []}))
        };

        let narrative = build_narrative(&case);

        Ok(json!({
            "status": "ok",
            "command": COMMAND,
            "schema": SCHEMA,
            "summary": {
                "case_id": case.case_id,
                "case_status": case.case_status,
                "event_count": events.len(),
                "task_ids": case.task_ids,
                "dispute_ids": case.dispute_ids,
                "trace_window": case.trace_window,
                "transition_count": case.transitions.len(),
                "actor_count": case.actor_map.len(),
                "sealed": params.sealed,
            },
            "validation": validation,
            "narrative": narrative,
            "case": case,
            "evidence_pack": evidence_pack,
            "command_params": {
                "task_pda": params.task_pda,
                "dispute_pda": params.dispute_pda,
                "from_slot": params.from_slot,
                "to_slot": params.to_slot,
                "sealed": params.sealed,
            },
            "sections": ["summary", "validation", "narrative", "case"],
            "redactions": params.redaction.remove_fields,
            "truncated": truncated,
            "truncation_reason": truncation_reason,
        }))
    }
}

/// Human-readable case digest for the `narrative` section.
fn build_narrative(case: &IncidentCase) -> Vec<String> {
    let invalid = case.transitions.iter().filter(|t| !t.valid).count();
    let mut lines = vec![
        format!(
            "Window spans slots {}..={} covering {} task(s) and {} dispute(s).",
            case.trace_window.from_slot,
            case.trace_window.to_slot,
            case.task_ids.len(),
            case.dispute_ids.len()
        ),
        format!(
            "Observed {} state transition(s), {} invalid.",
            case.transitions.len(),
            invalid
        ),
        format!("{} distinct actor(s) appear in the window.", case.actor_map.len()),
    ];
    if !case.anomaly_ids.is_empty() {
        lines.push(format!(
            "{} anomaly reference(s) attached.",
            case.anomaly_ids.len()
        ));
    }
    let status = match case.case_status {
        chainreplay_types::CaseStatus::Resolved => "resolved",
        chainreplay_types::CaseStatus::Open => "open",
        chainreplay_types::CaseStatus::Flagged => "flagged",
    };
    lines.push(format!("Case status: {}.", status));
    lines
}
