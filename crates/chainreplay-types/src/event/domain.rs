use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Provenance block carried by every typed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSource {
    pub event_name: String,
    pub slot: u64,
    pub signature: String,
    pub sequence: u64,
    pub timestamp_ms: i64,
}

/// Domain group of a raw event name. Used for strict-failure categories and
/// as the coarse filter axis of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Task,
    Dispute,
    Speculation,
    Agent,
    Protocol,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Task => "task",
            EventCategory::Dispute => "dispute",
            EventCategory::Speculation => "speculation",
            EventCategory::Agent => "agent",
            EventCategory::Protocol => "protocol",
        }
    }
}

/// A raw on-chain event after parsing and ID normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedDomainEvent {
    pub source: EventSource,
    pub payload: DomainPayload,
}

// NOTE: Closed union over the fixed event taxonomy (the wire ABI). Adding a
// variant is a minor schema version; removing one is a breaking change.
//
// Identifier conventions, applied by the parser before these structs exist:
// - task_id / dispute_id / agent_id / state_key / proof_hash / result_hash
//   are 32-byte opaque IDs rendered as lowercase hex
// - creator / worker / authority / voter / initiator / defendant / recipient /
//   treasury / updater / updated_by / agent / producer / commitment are
//   account addresses rendered as base58

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainPayload {
    // Task lifecycle
    TaskCreated(TaskCreated),
    TaskClaimed(TaskClaimed),
    TaskCompleted(TaskCompleted),
    TaskCancelled(TaskCancelled),
    DependentTaskCreated(DependentTaskCreated),

    // Dispute lifecycle
    DisputeInitiated(DisputeInitiated),
    DisputeVoteCast(DisputeVoteCast),
    DisputeResolved(DisputeResolved),
    DisputeExpired(DisputeExpired),
    DisputeCancelled(DisputeCancelled),
    ArbiterVotesCleanedUp(ArbiterVotesCleanedUp),

    // Speculation lifecycle
    SpeculativeCommitmentCreated(SpeculativeCommitmentCreated),
    BondLocked(BondLocked),
    BondReleased(BondReleased),
    BondSlashed(BondSlashed),
    BondDeposited(BondDeposited),

    // Agent lifecycle
    AgentRegistered(AgentRegistered),
    AgentUpdated(AgentUpdated),
    AgentDeregistered(AgentDeregistered),
    AgentSuspended(AgentSuspended),
    AgentUnsuspended(AgentUnsuspended),
    ReputationChanged(ReputationChanged),

    // Protocol admin
    ProtocolInitialized(ProtocolInitialized),
    StateUpdated(StateUpdated),
    RewardDistributed(RewardDistributed),
    RateLimitHit(RateLimitHit),
    RateLimitsUpdated(RateLimitsUpdated),
    ProtocolFeeUpdated(ProtocolFeeUpdated),
    MigrationCompleted(MigrationCompleted),
    ProtocolVersionUpdated(ProtocolVersionUpdated),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCreated {
    pub task_id: String,
    pub creator: String,
    pub reward: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_ts: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskClaimed {
    pub task_id: String,
    pub worker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bond: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCompleted {
    pub task_id: String,
    pub worker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCancelled {
    pub task_id: String,
    pub authority: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependentTaskCreated {
    pub task_id: String,
    pub parent_task_id: String,
    pub creator: String,
    pub reward: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisputeInitiated {
    pub dispute_id: String,
    pub task_id: String,
    pub initiator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defendant: Option<String>,
    pub stake: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisputeVoteCast {
    pub dispute_id: String,
    pub voter: String,
    pub supports_initiator: bool,
    pub weight: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisputeResolved {
    pub dispute_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    pub slashed_amount: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisputeExpired {
    pub dispute_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisputeCancelled {
    pub dispute_id: String,
    pub authority: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbiterVotesCleanedUp {
    pub dispute_id: String,
    pub votes_removed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeculativeCommitmentCreated {
    pub task_id: String,
    pub commitment: String,
    pub producer: String,
    pub bond: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondLocked {
    pub task_id: String,
    pub producer: String,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondReleased {
    pub task_id: String,
    pub recipient: String,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondSlashed {
    pub task_id: String,
    pub treasury: String,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondDeposited {
    pub producer: String,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRegistered {
    pub agent_id: String,
    pub authority: String,
    pub capabilities: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentUpdated {
    pub agent_id: String,
    pub updated_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDeregistered {
    pub agent_id: String,
    pub authority: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSuspended {
    pub agent_id: String,
    pub authority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentUnsuspended {
    pub agent_id: String,
    pub authority: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationChanged {
    pub agent_id: String,
    pub delta: i64,
    pub new_score: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolInitialized {
    pub authority: String,
    pub treasury: String,
    pub state_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateUpdated {
    pub state_key: String,
    pub updater: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardDistributed {
    pub recipient: String,
    pub amount: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitHit {
    pub agent: String,
    pub limit: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitsUpdated {
    pub updated_by: String,
    pub max_per_window: u64,
    pub window_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolFeeUpdated {
    pub updated_by: String,
    pub fee_bps: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationCompleted {
    pub authority: String,
    pub from_version: u64,
    pub to_version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolVersionUpdated {
    pub updated_by: String,
    pub version: u64,
}

impl DomainPayload {
    pub fn category(&self) -> EventCategory {
        use DomainPayload::*;
        match self {
            TaskCreated(_) | TaskClaimed(_) | TaskCompleted(_) | TaskCancelled(_)
            | DependentTaskCreated(_) => EventCategory::Task,
            DisputeInitiated(_) | DisputeVoteCast(_) | DisputeResolved(_)
            | DisputeExpired(_) | DisputeCancelled(_) | ArbiterVotesCleanedUp(_) => {
                EventCategory::Dispute
            }
            SpeculativeCommitmentCreated(_) | BondLocked(_) | BondReleased(_)
            | BondSlashed(_) | BondDeposited(_) => EventCategory::Speculation,
            AgentRegistered(_) | AgentUpdated(_) | AgentDeregistered(_)
            | AgentSuspended(_) | AgentUnsuspended(_) | ReputationChanged(_) => {
                EventCategory::Agent
            }
            ProtocolInitialized(_) | StateUpdated(_) | RewardDistributed(_)
            | RateLimitHit(_) | RateLimitsUpdated(_) | ProtocolFeeUpdated(_)
            | MigrationCompleted(_) | ProtocolVersionUpdated(_) => EventCategory::Protocol,
        }
    }

    /// Normalized task reference, when the event belongs to a task timeline.
    pub fn task_pda(&self) -> Option<&str> {
        use DomainPayload::*;
        match self {
            TaskCreated(p) => Some(&p.task_id),
            TaskClaimed(p) => Some(&p.task_id),
            TaskCompleted(p) => Some(&p.task_id),
            TaskCancelled(p) => Some(&p.task_id),
            DependentTaskCreated(p) => Some(&p.task_id),
            DisputeInitiated(p) => Some(&p.task_id),
            DisputeResolved(p) => p.task_id.as_deref(),
            SpeculativeCommitmentCreated(p) => Some(&p.task_id),
            BondLocked(p) => Some(&p.task_id),
            BondReleased(p) => Some(&p.task_id),
            BondSlashed(p) => Some(&p.task_id),
            RewardDistributed(p) => p.task_id.as_deref(),
            _ => None,
        }
    }

    /// Normalized dispute reference, when the event belongs to a dispute.
    pub fn dispute_pda(&self) -> Option<&str> {
        use DomainPayload::*;
        match self {
            DisputeInitiated(p) => Some(&p.dispute_id),
            DisputeVoteCast(p) => Some(&p.dispute_id),
            DisputeResolved(p) => Some(&p.dispute_id),
            DisputeExpired(p) => Some(&p.dispute_id),
            DisputeCancelled(p) => Some(&p.dispute_id),
            ArbiterVotesCleanedUp(p) => Some(&p.dispute_id),
            _ => None,
        }
    }

    /// The minimal canonical payload view: the parser-promoted fields,
    /// without the `onchain` block (the projector appends that).
    pub fn payload_value(&self) -> Value {
        use DomainPayload::*;
        let mut b = PayloadBuilder::new();
        match self {
            TaskCreated(p) => {
                b.str("task_id", &p.task_id);
                b.str("creator", &p.creator);
                b.u64("reward", p.reward);
                b.opt_i64("deadline_ts", p.deadline_ts);
                b.opt_u64("capabilities", p.capabilities);
            }
            TaskClaimed(p) => {
                b.str("task_id", &p.task_id);
                b.str("worker", &p.worker);
                b.opt_u64("bond", p.bond);
            }
            TaskCompleted(p) => {
                b.str("task_id", &p.task_id);
                b.str("worker", &p.worker);
                b.opt_str("result_hash", p.result_hash.as_deref());
            }
            TaskCancelled(p) => {
                b.str("task_id", &p.task_id);
                b.str("authority", &p.authority);
            }
            DependentTaskCreated(p) => {
                b.str("task_id", &p.task_id);
                b.str("parent_task_id", &p.parent_task_id);
                b.str("creator", &p.creator);
                b.u64("reward", p.reward);
            }
            DisputeInitiated(p) => {
                b.str("dispute_id", &p.dispute_id);
                b.str("task_id", &p.task_id);
                b.str("initiator", &p.initiator);
                b.opt_str("defendant", p.defendant.as_deref());
                b.u64("stake", p.stake);
            }
            DisputeVoteCast(p) => {
                b.str("dispute_id", &p.dispute_id);
                b.str("voter", &p.voter);
                b.bool("supports_initiator", p.supports_initiator);
                b.u64("weight", p.weight);
            }
            DisputeResolved(p) => {
                b.str("dispute_id", &p.dispute_id);
                b.opt_str("task_id", p.task_id.as_deref());
                b.opt_str("winner", p.winner.as_deref());
                b.u64("slashed_amount", p.slashed_amount);
            }
            DisputeExpired(p) => {
                b.str("dispute_id", &p.dispute_id);
            }
            DisputeCancelled(p) => {
                b.str("dispute_id", &p.dispute_id);
                b.str("authority", &p.authority);
            }
            ArbiterVotesCleanedUp(p) => {
                b.str("dispute_id", &p.dispute_id);
                b.u64("votes_removed", p.votes_removed);
            }
            SpeculativeCommitmentCreated(p) => {
                b.str("task_id", &p.task_id);
                b.str("commitment", &p.commitment);
                b.str("producer", &p.producer);
                b.u64("bond", p.bond);
            }
            BondLocked(p) => {
                b.str("task_id", &p.task_id);
                b.str("producer", &p.producer);
                b.u64("amount", p.amount);
            }
            BondReleased(p) => {
                b.str("task_id", &p.task_id);
                b.str("recipient", &p.recipient);
                b.u64("amount", p.amount);
            }
            BondSlashed(p) => {
                b.str("task_id", &p.task_id);
                b.str("treasury", &p.treasury);
                b.u64("amount", p.amount);
            }
            BondDeposited(p) => {
                b.str("producer", &p.producer);
                b.u64("amount", p.amount);
            }
            AgentRegistered(p) => {
                b.str("agent_id", &p.agent_id);
                b.str("authority", &p.authority);
                b.u64("capabilities", p.capabilities);
                b.opt_str("metadata_uri", p.metadata_uri.as_deref());
            }
            AgentUpdated(p) => {
                b.str("agent_id", &p.agent_id);
                b.str("updated_by", &p.updated_by);
                b.opt_u64("capabilities", p.capabilities);
            }
            AgentDeregistered(p) => {
                b.str("agent_id", &p.agent_id);
                b.str("authority", &p.authority);
            }
            AgentSuspended(p) => {
                b.str("agent_id", &p.agent_id);
                b.str("authority", &p.authority);
                b.opt_u64("reason_code", p.reason_code);
            }
            AgentUnsuspended(p) => {
                b.str("agent_id", &p.agent_id);
                b.str("authority", &p.authority);
            }
            ReputationChanged(p) => {
                b.str("agent_id", &p.agent_id);
                b.i64("delta", p.delta);
                b.u64("new_score", p.new_score);
            }
            ProtocolInitialized(p) => {
                b.str("authority", &p.authority);
                b.str("treasury", &p.treasury);
                b.str("state_key", &p.state_key);
            }
            StateUpdated(p) => {
                b.str("state_key", &p.state_key);
                b.str("updater", &p.updater);
            }
            RewardDistributed(p) => {
                b.str("recipient", &p.recipient);
                b.u64("amount", p.amount);
                b.opt_str("task_id", p.task_id.as_deref());
            }
            RateLimitHit(p) => {
                b.str("agent", &p.agent);
                b.u64("limit", p.limit);
            }
            RateLimitsUpdated(p) => {
                b.str("updated_by", &p.updated_by);
                b.u64("max_per_window", p.max_per_window);
                b.u64("window_secs", p.window_secs);
            }
            ProtocolFeeUpdated(p) => {
                b.str("updated_by", &p.updated_by);
                b.u64("fee_bps", p.fee_bps);
            }
            MigrationCompleted(p) => {
                b.str("authority", &p.authority);
                b.u64("from_version", p.from_version);
                b.u64("to_version", p.to_version);
            }
            ProtocolVersionUpdated(p) => {
                b.str("updated_by", &p.updated_by);
                b.u64("version", p.version);
            }
        }
        b.finish()
    }
}

struct PayloadBuilder {
    map: Map<String, Value>,
}

impl PayloadBuilder {
    fn new() -> Self {
        Self { map: Map::new() }
    }

    fn str(&mut self, key: &str, value: &str) {
        self.map.insert(key.to_string(), Value::from(value.to_string()));
    }

    fn opt_str(&mut self, key: &str, value: Option<&str>) {
        if let Some(v) = value {
            self.str(key, v);
        }
    }

    fn u64(&mut self, key: &str, value: u64) {
        self.map.insert(key.to_string(), Value::from(value));
    }

    fn opt_u64(&mut self, key: &str, value: Option<u64>) {
        if let Some(v) = value {
            self.u64(key, v);
        }
    }

    fn i64(&mut self, key: &str, value: i64) {
        self.map.insert(key.to_string(), Value::from(value));
    }

    fn opt_i64(&mut self, key: &str, value: Option<i64>) {
        if let Some(v) = value {
            self.i64(key, v);
        }
    }

    fn bool(&mut self, key: &str, value: bool) {
        self.map.insert(key.to_string(), Value::from(value));
    }

    fn finish(self) -> Value {
        Value::Object(self.map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_omits_absent_options() {
        let payload = DomainPayload::TaskClaimed(TaskClaimed {
            task_id: "aa".repeat(32),
            worker: "Worker111".to_string(),
            bond: None,
        });
        let value = payload.payload_value();
        assert!(value.get("bond").is_none());
        assert_eq!(value.get("worker").and_then(|v| v.as_str()), Some("Worker111"));
    }

    #[test]
    fn test_dispute_event_carries_both_pdas() {
        let payload = DomainPayload::DisputeInitiated(DisputeInitiated {
            dispute_id: "d1".to_string(),
            task_id: "t1".to_string(),
            initiator: "Init".to_string(),
            defendant: None,
            stake: 5,
        });
        assert_eq!(payload.task_pda(), Some("t1"));
        assert_eq!(payload.dispute_pda(), Some("d1"));
        assert_eq!(payload.category(), EventCategory::Dispute);
    }

    #[test]
    fn test_bond_deposit_has_no_task() {
        let payload = DomainPayload::BondDeposited(BondDeposited {
            producer: "Prod".to_string(),
            amount: 10,
        });
        assert_eq!(payload.task_pda(), None);
    }
}
