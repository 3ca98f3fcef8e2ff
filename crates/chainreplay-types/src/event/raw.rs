use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw on-chain event record as produced by the external RPC collaborator.
///
/// The `event` payload shape varies per `event_name`; 32-byte identifiers
/// inside it may arrive as byte arrays, hex strings, or base58 strings and
/// are normalized by the parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOnChainEvent {
    pub event_name: String,
    pub slot: u64,
    pub signature: String,
    pub timestamp_ms: i64,
    pub source_event_sequence: u64,
    pub event: Value,
}

impl RawOnChainEvent {
    /// Ingest identity: duplicates on this key are dropped exactly once.
    pub fn ingest_key(&self) -> (u64, &str, &str) {
        (self.slot, self.signature.as_str(), self.event_name.as_str())
    }
}
