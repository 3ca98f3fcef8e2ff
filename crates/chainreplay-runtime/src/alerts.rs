use std::collections::HashMap;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use chainreplay_types::{AlertKind, ReplayAnomalyAlert, Severity};

/// Pluggable alert sink. Adapters may perform network I/O; the dispatcher
/// awaits them sequentially and swallows their failures.
pub trait AlertAdapter: Send + Sync {
    fn name(&self) -> &str;
    fn emit<'a>(&'a self, alert: &'a ReplayAnomalyAlert) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// Everything an emit call needs to build the final alert.
#[derive(Debug, Clone)]
pub struct AlertContext {
    pub code: String,
    pub severity: Severity,
    pub kind: AlertKind,
    pub message: String,
    pub task_pda: Option<String>,
    pub dispute_pda: Option<String>,
    pub source_event_name: Option<String>,
    pub signature: Option<String>,
    pub slot: Option<u64>,
    pub source_event_sequence: Option<u64>,
    pub trace_id: Option<String>,
    pub metadata: Option<Value>,
    pub occurred_at_ms: Option<i64>,
}

impl AlertContext {
    pub fn new(
        code: impl Into<String>,
        severity: Severity,
        kind: AlertKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            severity,
            kind,
            message: message.into(),
            task_pda: None,
            dispute_pda: None,
            source_event_name: None,
            signature: None,
            slot: None,
            source_event_sequence: None,
            trace_id: None,
            metadata: None,
            occurred_at_ms: None,
        }
    }

    /// Scope component of the dedupe key: the most specific identity the
    /// context carries.
    fn dedupe_scope(&self) -> &str {
        self.task_pda
            .as_deref()
            .or(self.dispute_pda.as_deref())
            .or(self.source_event_name.as_deref())
            .or(self.signature.as_deref())
            .unwrap_or("global")
    }

    fn dedupe_key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.code,
            self.kind.as_str(),
            self.dedupe_scope(),
            self.slot.map(|s| s.to_string()).unwrap_or_default()
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertDispatcherConfig {
    pub enabled: bool,
    pub dedupe_window_ms: i64,
    pub max_tracked_dedupe_keys: usize,
}

impl Default for AlertDispatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dedupe_window_ms: 60_000,
            max_tracked_dedupe_keys: 10_000,
        }
    }
}

struct DedupeEntry {
    last_emitted_ms: i64,
    suppressed: u64,
    touched: u64,
}

/// Deduped, severity-tiered alert emission.
///
/// The dedupe map is the dispatcher's only state: bounded by
/// `max_tracked_dedupe_keys` with least-recently-touched eviction.
pub struct AlertDispatcher {
    config: AlertDispatcherConfig,
    adapters: Vec<Box<dyn AlertAdapter>>,
    entries: HashMap<String, DedupeEntry>,
    touch_counter: u64,
    clock: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl AlertDispatcher {
    pub fn new(config: AlertDispatcherConfig) -> Self {
        Self {
            config,
            adapters: Vec::new(),
            entries: HashMap::new(),
            touch_counter: 0,
            clock: Box::new(|| chrono::Utc::now().timestamp_millis()),
        }
    }

    /// A dispatcher that never emits. Used when alerting is not wired up.
    pub fn disabled() -> Self {
        Self::new(AlertDispatcherConfig {
            enabled: false,
            ..Default::default()
        })
    }

    /// Inject the emission clock (tests, deterministic replays).
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn add_adapter(&mut self, adapter: Box<dyn AlertAdapter>) {
        self.adapters.push(adapter);
    }

    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    /// Emit an alert unless a previous emission for the same dedupe key is
    /// still inside the window. Returns the dispatched alert, `None` when
    /// disabled, unrouted, or suppressed.
    pub async fn emit(&mut self, context: AlertContext) -> Option<ReplayAnomalyAlert> {
        if !self.config.enabled || self.adapters.is_empty() {
            return None;
        }

        let now = (self.clock)();
        let key = context.dedupe_key();
        self.touch_counter += 1;

        if let Some(entry) = self.entries.get_mut(&key) {
            if now - entry.last_emitted_ms < self.config.dedupe_window_ms {
                entry.suppressed += 1;
                entry.touched = self.touch_counter;
                return None;
            }
        }

        let repeat_count = self
            .entries
            .get(&key)
            .map(|entry| entry.suppressed)
            .unwrap_or(0);
        self.entries.insert(
            key,
            DedupeEntry {
                last_emitted_ms: now,
                suppressed: 0,
                touched: self.touch_counter,
            },
        );
        self.evict_over_capacity();

        let mut alert = ReplayAnomalyAlert {
            id: String::new(),
            code: context.code,
            severity: context.severity,
            kind: context.kind,
            message: context.message,
            task_pda: context.task_pda,
            dispute_pda: context.dispute_pda,
            source_event_name: context.source_event_name,
            signature: context.signature,
            slot: context.slot,
            source_event_sequence: context.source_event_sequence,
            trace_id: context.trace_id,
            metadata: context.metadata,
            occurred_at_ms: context.occurred_at_ms,
            repeat_count,
            emitted_at_ms: now,
        };
        alert.id = alert.compute_id();

        // Sequential emission preserves ordering within one call; adapter
        // failures are swallowed, the first alert wins.
        for adapter in &self.adapters {
            let _ = adapter.emit(&alert).await;
        }

        Some(alert)
    }

    fn evict_over_capacity(&mut self) {
        while self.entries.len() > self.config.max_tracked_dedupe_keys {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.touched)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }
}
