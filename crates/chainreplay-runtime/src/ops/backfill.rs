use serde_json::{json, Value};

use crate::backfill::{BackfillOptions, BackfillService};
use crate::cancel::CancelToken;
use crate::envelope::error_envelope;
use crate::fetcher::PageFetcher;
use crate::ops::{AuthContext, ToolRuntime};
use crate::policy::{check_access, resolve_actor, risk_level};

pub const COMMAND: &str = "replay.backfill";
pub const SCHEMA: &str = "replay.backfill.output.v1";

#[derive(Debug, Clone, Default)]
pub struct BackfillParams {
    /// RPC endpoint label, echoed into `command_params`. The fetcher itself
    /// is passed separately.
    pub rpc: Option<String>,
    pub to_slot: u64,
    pub page_size: Option<usize>,
    pub max_lag_slots: Option<u64>,
    pub redact_fields: Vec<String>,
    pub seed: u64,
}

impl ToolRuntime {
    /// `replay.backfill`: paginated catch-up ingestion into the configured
    /// store. High-risk: mutates persistent state.
    pub async fn backfill<F: PageFetcher>(
        &mut self,
        params: &BackfillParams,
        fetcher: F,
        auth: &AuthContext,
        cancel: &CancelToken,
    ) -> Value {
        let started = self.now_ms();
        let actor = resolve_actor(auth.auth_client_id.as_deref(), auth.session_id.as_deref());
        let risk = risk_level("backfill", None);

        if let Err(error) = check_access(&self.policy, "backfill", &actor, None) {
            self.record_audit(
                COMMAND,
                &actor,
                &auth.request_id,
                "denied",
                started,
                Some(error.to_string()),
                Some(error.code().to_string()),
                risk,
                false,
            );
            return error_envelope(COMMAND, SCHEMA, &error);
        }

        let options = BackfillOptions {
            to_slot: params.to_slot,
            page_size: params.page_size.unwrap_or(256),
            max_lag_slots: params.max_lag_slots,
            seed: params.seed,
            created_at_ms: started,
        };

        let runtime_cap = std::time::Duration::from_millis(self.policy.max_tool_runtime_ms);
        let result = {
            let mut service = BackfillService::new(self.store.as_mut(), fetcher)
                .with_dispatcher(&mut self.dispatcher);
            match tokio::time::timeout(runtime_cap, service.run(&options, cancel, |_| {})).await {
                Ok(result) => result,
                Err(_) => Err(crate::error::Error::LimitsExceeded(format!(
                    "backfill exceeded max_tool_runtime_ms {}",
                    self.policy.max_tool_runtime_ms
                ))),
            }
        };

        match result {
            Ok(report) => {
                self.record_audit(
                    COMMAND,
                    &actor,
                    &auth.request_id,
                    "ok",
                    started,
                    None,
                    None,
                    risk,
                    true,
                );
                let mut redactions = self.policy.default_redactions.clone();
                redactions.extend(params.redact_fields.iter().cloned());
                json!({
                    "status": "ok",
                    "command": COMMAND,
                    "schema": SCHEMA,
                    "mode": "lenient",
                    "to_slot": params.to_slot,
                    "store_type": self.store_type.as_str(),
                    "result": {
                        "processed": report.processed,
                        "duplicates": report.duplicates,
                        "cursor": report.cursor,
                        "pages": report.pages,
                    },
                    "telemetry": report.telemetry,
                    "alerts_emitted": report.alerts_emitted,
                    "halted": report.halted,
                    "command_params": {
                        "rpc": params.rpc,
                        "to_slot": params.to_slot,
                        "page_size": options.page_size,
                    },
                    "sections": ["result", "telemetry"],
                    "redactions": redactions,
                    "truncated": false,
                })
            }
            Err(error) => {
                self.record_audit(
                    COMMAND,
                    &actor,
                    &auth.request_id,
                    "error",
                    started,
                    Some(error.to_string()),
                    Some(error.code().to_string()),
                    risk,
                    true,
                );
                error_envelope(COMMAND, SCHEMA, &error)
            }
        }
    }
}
