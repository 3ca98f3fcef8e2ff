use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Global caps and access rules for the tool surface. Per-command inputs
/// may narrow these but never widen them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayPolicy {
    pub max_slot_window: u64,
    pub max_event_count: usize,
    pub max_concurrent_jobs: usize,
    pub max_tool_runtime_ms: u64,
    #[serde(default)]
    pub allowlist: Vec<String>,
    #[serde(default)]
    pub denylist: Vec<String>,
    #[serde(default)]
    pub default_redactions: Vec<String>,
    pub audit_enabled: bool,
    #[serde(default)]
    pub require_auth_for_high_risk: bool,
}

impl Default for ReplayPolicy {
    fn default() -> Self {
        Self {
            max_slot_window: 500_000,
            max_event_count: 50_000,
            max_concurrent_jobs: 4,
            max_tool_runtime_ms: 30_000,
            allowlist: Vec::new(),
            denylist: Vec::new(),
            default_redactions: Vec::new(),
            audit_enabled: true,
            require_auth_for_high_risk: false,
        }
    }
}

/// Resolved identity of the invoking principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Authenticated(String),
    Session(String),
    Anonymous,
}

impl Actor {
    pub fn label(&self) -> String {
        match self {
            Actor::Authenticated(client_id) => client_id.clone(),
            Actor::Session(session_id) => format!("session_id:{}", session_id),
            Actor::Anonymous => "anonymous".to_string(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Actor::Authenticated(_))
    }
}

/// Actor resolution order: auth client id, then session id, then anonymous.
pub fn resolve_actor(auth_client_id: Option<&str>, session_id: Option<&str>) -> Actor {
    if let Some(client_id) = auth_client_id {
        return Actor::Authenticated(client_id.to_string());
    }
    if let Some(session_id) = session_id {
        return Actor::Session(session_id.to_string());
    }
    Actor::Anonymous
}

/// High-risk tools: `backfill` always, `incident` when the pack is emitted
/// unsealed.
pub fn is_high_risk(tool: &str, sealed: Option<bool>) -> bool {
    match tool {
        "backfill" => true,
        "incident" => sealed == Some(false),
        _ => false,
    }
}

pub fn risk_level(tool: &str, sealed: Option<bool>) -> &'static str {
    if is_high_risk(tool, sealed) {
        "high"
    } else {
        "low"
    }
}

/// Permission order: denylist first, then allowlist, then high-risk
/// authentication gating.
pub fn check_access(
    policy: &ReplayPolicy,
    tool: &str,
    actor: &Actor,
    sealed: Option<bool>,
) -> Result<()> {
    if policy.denylist.iter().any(|t| t == tool) {
        return Err(Error::AccessDenied(format!("tool '{}' is denylisted", tool)));
    }
    if !policy.allowlist.is_empty() && !policy.allowlist.iter().any(|t| t == tool) {
        return Err(Error::AccessDenied(format!(
            "tool '{}' is not on the allowlist",
            tool
        )));
    }
    if is_high_risk(tool, sealed)
        && policy.require_auth_for_high_risk
        && !actor.is_authenticated()
    {
        return Err(Error::AccessDenied(format!(
            "tool '{}' requires an authenticated actor",
            tool
        )));
    }
    Ok(())
}

/// Caps echoed into every audit entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EffectiveCaps {
    pub max_slot_window: u64,
    pub max_event_count: usize,
    pub max_tool_runtime_ms: u64,
}

impl From<&ReplayPolicy> for EffectiveCaps {
    fn from(policy: &ReplayPolicy) -> Self {
        Self {
            max_slot_window: policy.max_slot_window,
            max_event_count: policy.max_event_count,
            max_tool_runtime_ms: policy.max_tool_runtime_ms,
        }
    }
}

/// One structured audit line per tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: String,
    pub tool: String,
    pub actor: String,
    pub request_id: String,
    pub status: String,
    pub duration_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation_code: Option<String>,
    pub risk_level: String,
    pub mutated_state: bool,
    pub effective_caps: EffectiveCaps,
}
