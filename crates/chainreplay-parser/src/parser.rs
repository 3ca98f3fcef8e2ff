use chainreplay_types::{
    AgentDeregistered, AgentRegistered, AgentSuspended, AgentUnsuspended, AgentUpdated,
    ArbiterVotesCleanedUp, BondDeposited, BondLocked, BondReleased, BondSlashed,
    DependentTaskCreated, DisputeCancelled, DisputeExpired, DisputeInitiated, DisputeResolved,
    DisputeVoteCast, DomainPayload, EventCategory, EventSource, MigrationCompleted,
    ProtocolFeeUpdated, ProtocolInitialized, ProtocolVersionUpdated, RateLimitHit,
    RateLimitsUpdated, RawOnChainEvent, ReputationChanged, RewardDistributed,
    SpeculativeCommitmentCreated, StateUpdated, TaskCancelled, TaskClaimed, TaskCompleted,
    TaskCreated, TypedDomainEvent,
};

use crate::error::Result;
use crate::fields::FieldReader;

/// Domain group of a raw event name, `None` for names outside the taxonomy.
pub fn event_category(event_name: &str) -> Option<EventCategory> {
    let category = match event_name {
        "task_created" | "task_claimed" | "task_completed" | "task_cancelled"
        | "dependent_task_created" => EventCategory::Task,
        "dispute_initiated" | "dispute_vote_cast" | "dispute_resolved" | "dispute_expired"
        | "dispute_cancelled" | "arbiter_votes_cleaned_up" => EventCategory::Dispute,
        "speculative_commitment_created" | "bond_locked" | "bond_released" | "bond_slashed"
        | "bond_deposited" => EventCategory::Speculation,
        "agent_registered" | "agent_updated" | "agent_deregistered" | "agent_suspended"
        | "agent_unsuspended" | "reputation_changed" => EventCategory::Agent,
        "protocol_initialized" | "state_updated" | "reward_distributed" | "rate_limit_hit"
        | "rate_limits_updated" | "protocol_fee_updated" | "migration_completed"
        | "protocol_version_updated" => EventCategory::Protocol,
        _ => return None,
    };
    Some(category)
}

pub fn is_known_event(event_name: &str) -> bool {
    event_category(event_name).is_some()
}

/// Parse a raw on-chain record into a typed domain event.
///
/// Returns `Ok(None)` for event names outside the fixed taxonomy; the
/// projector counts those as `unknown_events`. Schema failures return the
/// parse error taxonomy (`missing_field` / `wrong_arity` / `invalid_bytes`).
pub fn parse_raw_event(raw: &RawOnChainEvent) -> Result<Option<TypedDomainEvent>> {
    if !is_known_event(&raw.event_name) {
        return Ok(None);
    }

    let r = FieldReader::new(&raw.event)?;
    let payload = match raw.event_name.as_str() {
        "task_created" => DomainPayload::TaskCreated(TaskCreated {
            task_id: r.hex_id("task_id")?,
            creator: r.pubkey("creator")?,
            reward: r.u64("reward")?,
            deadline_ts: r.opt_i64("deadline_ts")?,
            capabilities: r.opt_u64("capabilities")?,
        }),
        "task_claimed" => DomainPayload::TaskClaimed(TaskClaimed {
            task_id: r.hex_id("task_id")?,
            worker: r.pubkey("worker")?,
            bond: r.opt_u64("bond")?,
        }),
        "task_completed" => DomainPayload::TaskCompleted(TaskCompleted {
            task_id: r.hex_id("task_id")?,
            worker: r.pubkey("worker")?,
            result_hash: r.opt_hex_id("result_hash")?,
        }),
        "task_cancelled" => DomainPayload::TaskCancelled(TaskCancelled {
            task_id: r.hex_id("task_id")?,
            authority: r.pubkey("authority")?,
        }),
        "dependent_task_created" => DomainPayload::DependentTaskCreated(DependentTaskCreated {
            task_id: r.hex_id("task_id")?,
            parent_task_id: r.hex_id("parent_task_id")?,
            creator: r.pubkey("creator")?,
            reward: r.u64("reward")?,
        }),
        "dispute_initiated" => DomainPayload::DisputeInitiated(DisputeInitiated {
            dispute_id: r.hex_id("dispute_id")?,
            task_id: r.hex_id("task_id")?,
            initiator: r.pubkey("initiator")?,
            defendant: r.opt_pubkey("defendant")?,
            stake: r.u64("stake")?,
        }),
        "dispute_vote_cast" => DomainPayload::DisputeVoteCast(DisputeVoteCast {
            dispute_id: r.hex_id("dispute_id")?,
            voter: r.pubkey("voter")?,
            supports_initiator: r.bool("supports_initiator")?,
            weight: r.u64("weight")?,
        }),
        "dispute_resolved" => DomainPayload::DisputeResolved(DisputeResolved {
            dispute_id: r.hex_id("dispute_id")?,
            task_id: r.opt_hex_id("task_id")?,
            winner: r.opt_pubkey("winner")?,
            slashed_amount: r.u64("slashed_amount")?,
        }),
        "dispute_expired" => DomainPayload::DisputeExpired(DisputeExpired {
            dispute_id: r.hex_id("dispute_id")?,
        }),
        "dispute_cancelled" => DomainPayload::DisputeCancelled(DisputeCancelled {
            dispute_id: r.hex_id("dispute_id")?,
            authority: r.pubkey("authority")?,
        }),
        "arbiter_votes_cleaned_up" => {
            DomainPayload::ArbiterVotesCleanedUp(ArbiterVotesCleanedUp {
                dispute_id: r.hex_id("dispute_id")?,
                votes_removed: r.u64("votes_removed")?,
            })
        }
        "speculative_commitment_created" => {
            DomainPayload::SpeculativeCommitmentCreated(SpeculativeCommitmentCreated {
                task_id: r.hex_id("task_id")?,
                commitment: r.pubkey("commitment")?,
                producer: r.pubkey("producer")?,
                bond: r.u64("bond")?,
            })
        }
        "bond_locked" => DomainPayload::BondLocked(BondLocked {
            task_id: r.hex_id("task_id")?,
            producer: r.pubkey("producer")?,
            amount: r.u64("amount")?,
        }),
        "bond_released" => DomainPayload::BondReleased(BondReleased {
            task_id: r.hex_id("task_id")?,
            recipient: r.pubkey("recipient")?,
            amount: r.u64("amount")?,
        }),
        "bond_slashed" => DomainPayload::BondSlashed(BondSlashed {
            task_id: r.hex_id("task_id")?,
            treasury: r.pubkey("treasury")?,
            amount: r.u64("amount")?,
        }),
        "bond_deposited" => DomainPayload::BondDeposited(BondDeposited {
            producer: r.pubkey("producer")?,
            amount: r.u64("amount")?,
        }),
        "agent_registered" => DomainPayload::AgentRegistered(AgentRegistered {
            agent_id: r.hex_id("agent_id")?,
            authority: r.pubkey("authority")?,
            capabilities: r.u64("capabilities")?,
            metadata_uri: r.opt_string("metadata_uri")?,
        }),
        "agent_updated" => DomainPayload::AgentUpdated(AgentUpdated {
            agent_id: r.hex_id("agent_id")?,
            updated_by: r.pubkey("updated_by")?,
            capabilities: r.opt_u64("capabilities")?,
        }),
        "agent_deregistered" => DomainPayload::AgentDeregistered(AgentDeregistered {
            agent_id: r.hex_id("agent_id")?,
            authority: r.pubkey("authority")?,
        }),
        "agent_suspended" => DomainPayload::AgentSuspended(AgentSuspended {
            agent_id: r.hex_id("agent_id")?,
            authority: r.pubkey("authority")?,
            reason_code: r.opt_u64("reason_code")?,
        }),
        "agent_unsuspended" => DomainPayload::AgentUnsuspended(AgentUnsuspended {
            agent_id: r.hex_id("agent_id")?,
            authority: r.pubkey("authority")?,
        }),
        "reputation_changed" => DomainPayload::ReputationChanged(ReputationChanged {
            agent_id: r.hex_id("agent_id")?,
            delta: r.i64("delta")?,
            new_score: r.u64("new_score")?,
        }),
        "protocol_initialized" => DomainPayload::ProtocolInitialized(ProtocolInitialized {
            authority: r.pubkey("authority")?,
            treasury: r.pubkey("treasury")?,
            state_key: r.hex_id("state_key")?,
        }),
        "state_updated" => DomainPayload::StateUpdated(StateUpdated {
            state_key: r.hex_id("state_key")?,
            updater: r.pubkey("updater")?,
        }),
        "reward_distributed" => DomainPayload::RewardDistributed(RewardDistributed {
            recipient: r.pubkey("recipient")?,
            amount: r.u64("amount")?,
            task_id: r.opt_hex_id("task_id")?,
        }),
        "rate_limit_hit" => DomainPayload::RateLimitHit(RateLimitHit {
            agent: r.pubkey("agent")?,
            limit: r.u64("limit")?,
        }),
        "rate_limits_updated" => DomainPayload::RateLimitsUpdated(RateLimitsUpdated {
            updated_by: r.pubkey("updated_by")?,
            max_per_window: r.u64("max_per_window")?,
            window_secs: r.u64("window_secs")?,
        }),
        "protocol_fee_updated" => DomainPayload::ProtocolFeeUpdated(ProtocolFeeUpdated {
            updated_by: r.pubkey("updated_by")?,
            fee_bps: r.u64("fee_bps")?,
        }),
        "migration_completed" => DomainPayload::MigrationCompleted(MigrationCompleted {
            authority: r.pubkey("authority")?,
            from_version: r.u64("from_version")?,
            to_version: r.u64("to_version")?,
        }),
        "protocol_version_updated" => {
            DomainPayload::ProtocolVersionUpdated(ProtocolVersionUpdated {
                updated_by: r.pubkey("updated_by")?,
                version: r.u64("version")?,
            })
        }
        // is_known_event gated above
        _ => return Ok(None),
    };

    Ok(Some(TypedDomainEvent {
        source: EventSource {
            event_name: raw.event_name.clone(),
            slot: raw.slot,
            signature: raw.signature.clone(),
            sequence: raw.source_event_sequence,
            timestamp_ms: raw.timestamp_ms,
        },
        payload,
    }))
}
