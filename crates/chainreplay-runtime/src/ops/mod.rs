mod backfill;
mod compare;
mod incident;
mod status;

pub use backfill::BackfillParams;
pub use compare::CompareParams;
pub use incident::IncidentParams;

use chainreplay_store::TimelineStore;

use crate::alerts::AlertDispatcher;
use crate::config::StoreType;
use crate::policy::{Actor, AuditEntry, EffectiveCaps, ReplayPolicy};

/// Caller identity forwarded by the transport layer.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub auth_client_id: Option<String>,
    pub session_id: Option<String>,
    pub request_id: String,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self {
            auth_client_id: None,
            session_id: None,
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

type AuditSink = Box<dyn FnMut(AuditEntry) + Send>;

/// The structured tool surface: four commands over one store, one policy,
/// one alert dispatcher. Transport adapters (stdio MCP, JSON-over-stream)
/// call these methods and ship the returned envelopes verbatim.
pub struct ToolRuntime {
    pub(crate) store: Box<dyn TimelineStore>,
    pub(crate) store_type: StoreType,
    pub(crate) policy: ReplayPolicy,
    pub(crate) dispatcher: AlertDispatcher,
    audit_sink: Option<AuditSink>,
    pub(crate) clock: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl ToolRuntime {
    pub fn new(store: Box<dyn TimelineStore>, store_type: StoreType) -> Self {
        Self {
            store,
            store_type,
            policy: ReplayPolicy::default(),
            dispatcher: AlertDispatcher::disabled(),
            audit_sink: None,
            clock: Box::new(|| chrono::Utc::now().timestamp_millis()),
        }
    }

    pub fn with_policy(mut self, policy: ReplayPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: AlertDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn with_audit_sink(mut self, sink: impl FnMut(AuditEntry) + Send + 'static) -> Self {
        self.audit_sink = Some(Box::new(sink));
        self
    }

    /// Inject the wall clock (tests, deterministic replays).
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn store(&self) -> &dyn TimelineStore {
        self.store.as_ref()
    }

    pub fn store_mut(&mut self) -> &mut dyn TimelineStore {
        self.store.as_mut()
    }

    pub(crate) fn now_ms(&self) -> i64 {
        (self.clock)()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn record_audit(
        &mut self,
        tool: &str,
        actor: &Actor,
        request_id: &str,
        status: &str,
        started_ms: i64,
        reason: Option<String>,
        violation_code: Option<String>,
        risk_level: &str,
        mutated_state: bool,
    ) {
        if !self.policy.audit_enabled {
            return;
        }
        let now = self.now_ms();
        let entry = AuditEntry {
            timestamp: chrono::DateTime::from_timestamp_millis(now)
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_default(),
            tool: tool.to_string(),
            actor: actor.label(),
            request_id: request_id.to_string(),
            status: status.to_string(),
            duration_ms: now - started_ms,
            reason,
            violation_code,
            risk_level: risk_level.to_string(),
            mutated_state,
            effective_caps: EffectiveCaps::from(&self.policy),
        };
        if let Some(sink) = &mut self.audit_sink {
            sink(entry);
        }
    }
}
