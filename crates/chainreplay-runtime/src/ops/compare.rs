use std::path::PathBuf;

use serde_json::{json, Value};

use chainreplay_engine::{compare_trajectory, CompareOptions, CompareStatus, Strictness};
use chainreplay_store::TimelineFilter;
use chainreplay_types::ProjectedTimelineEvent;

use crate::envelope::error_envelope;
use crate::error::{Error, Result};
use crate::ops::{AuthContext, ToolRuntime};
use crate::policy::{check_access, resolve_actor, risk_level};
use crate::trace_file::load_trajectory;

pub const COMMAND: &str = "replay.compare";
pub const SCHEMA: &str = "replay.compare.output.v1";

#[derive(Debug, Clone, Default)]
pub struct CompareParams {
    pub local_trace_path: PathBuf,
    pub strict_mode: bool,
    pub task_pda: Option<String>,
    pub dispute_pda: Option<String>,
    pub from_slot: Option<u64>,
    pub to_slot: Option<u64>,
    pub redact_fields: Vec<String>,
}

impl ToolRuntime {
    /// `replay.compare`: divergence detection between a local trajectory
    /// and the projected timeline read from the store.
    pub fn compare(&mut self, params: &CompareParams, auth: &AuthContext) -> Value {
        let started = self.now_ms();
        let actor = resolve_actor(auth.auth_client_id.as_deref(), auth.session_id.as_deref());
        let risk = risk_level("compare", None);

        let outcome = self.run_compare(params, &actor);
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

    fn run_compare(
        &mut self,
        params: &CompareParams,
        actor: &crate::policy::Actor,
    ) -> Result<Value> {
        check_access(&self.policy, "compare", actor, None)?;

        if let (Some(from), Some(to)) = (params.from_slot, params.to_slot)
            && to.saturating_sub(from) > self.policy.max_slot_window
        {
            return Err(Error::LimitsExceeded(format!(
                "slot window {} exceeds max_slot_window {}",
                to - from,
                self.policy.max_slot_window
            )));
        }

        let trace = load_trajectory(&params.local_trace_path)?;

        let filter = TimelineFilter {
            task_pda: params.task_pda.clone(),
            dispute_pda: params.dispute_pda.clone(),
            from_slot: params.from_slot,
            to_slot: params.to_slot,
            ..Default::default()
        };
        let records = self.store.query(&filter)?;
        if records.len() > self.policy.max_event_count {
            return Err(Error::LimitsExceeded(format!(
                "{} projected events exceed max_event_count {}",
                records.len(),
                self.policy.max_event_count
            )));
        }
        let events: Vec<ProjectedTimelineEvent> =
            records.into_iter().map(|r| r.event).collect();

        let mut redact_fields = self.policy.default_redactions.clone();
        redact_fields.extend(params.redact_fields.iter().cloned());

        let strictness = if params.strict_mode {
            Strictness::Strict
        } else {
            Strictness::Lenient
        };
        let report = compare_trajectory(
            &events,
            &trace,
            &CompareOptions {
                strictness,
                redact_fields: redact_fields.clone(),
            },
        );

        if params.strict_mode && report.status == CompareStatus::Mismatched {
            return Err(Error::CompareMismatch {
                mismatch_count: report.mismatch_count,
            });
        }

        Ok(json!({
            "status": "ok",
            "command": COMMAND,
            "schema": SCHEMA,
            "strictness": strictness.as_str(),
            "result": {
                "status": report.status.as_str(),
                "mismatch_count": report.mismatch_count,
                "anomaly_ids": report.anomaly_ids,
                "top_anomalies": report.top_anomalies,
                "projected_event_count": report.projected_event_count,
                "local_event_count": report.local_event_count,
                "redactions_applied": report.redactions_applied,
            },
            "command_params": {
                "local_trace_path": params.local_trace_path.display().to_string(),
                "strict_mode": params.strict_mode,
                "task_pda": params.task_pda,
                "dispute_pda": params.dispute_pda,
            },
            "sections": ["result"],
            "redactions": redact_fields,
            "truncated": false,
        }))
    }
}
