use serde_json::{json, Value};

use crate::envelope::error_envelope;
use crate::error::Result;
use crate::ops::{AuthContext, ToolRuntime};
use crate::policy::{check_access, resolve_actor, risk_level};

pub const COMMAND: &str = "replay.status";
pub const SCHEMA: &str = "replay.status.output.v1";

impl ToolRuntime {
    /// `replay.status`: store-level counters and the active backfill cursor.
    pub fn status(&mut self, auth: &AuthContext) -> Value {
        let started = self.now_ms();
        let actor = resolve_actor(auth.auth_client_id.as_deref(), auth.session_id.as_deref());
        let risk = risk_level("status", None);

        let outcome = self.run_status(&actor);
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

    fn run_status(&mut self, actor: &crate::policy::Actor) -> Result<Value> {
        check_access(&self.policy, "status", actor, None)?;

        let stats = self.store.stats()?;
        let cursor = self.store.get_cursor()?;

        Ok(json!({
            "status": "ok",
            "command": COMMAND,
            "schema": SCHEMA,
            "store_type": self.store_type.as_str(),
            "event_count": stats.event_count,
            "unique_task_count": stats.unique_task_count,
            "unique_dispute_count": stats.unique_dispute_count,
            "active_cursor": cursor,
            "sections": ["counts", "cursor"],
            "truncated": false,
        }))
    }
}
