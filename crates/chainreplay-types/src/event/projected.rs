use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Canonical timeline tag of a projected event.
///
/// The tag set is closed apart from the `protocol:*` family, which carries
/// its suffix verbatim. Ordering is lexicographic over the rendered tag so
/// the projector's final sort is identical across platforms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProjectedType {
    Discovered,
    Claimed,
    Completed,
    Failed,
    Disputed,
    DisputeInitiated,
    DisputeVoteCast,
    DisputeResolved,
    DisputeCancelled,
    DisputeExpired,
    SpeculationStarted,
    SpeculationConfirmed,
    SpeculationAborted,
    /// Full tag including the `protocol:` prefix, e.g. `protocol:state_updated`.
    Protocol(String),
}

impl ProjectedType {
    pub fn protocol(suffix: &str) -> Self {
        ProjectedType::Protocol(format!("protocol:{}", suffix))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProjectedType::Discovered => "discovered",
            ProjectedType::Claimed => "claimed",
            ProjectedType::Completed => "completed",
            ProjectedType::Failed => "failed",
            ProjectedType::Disputed => "disputed",
            ProjectedType::DisputeInitiated => "dispute:initiated",
            ProjectedType::DisputeVoteCast => "dispute:vote_cast",
            ProjectedType::DisputeResolved => "dispute:resolved",
            ProjectedType::DisputeCancelled => "dispute:cancelled",
            ProjectedType::DisputeExpired => "dispute:expired",
            ProjectedType::SpeculationStarted => "speculation_started",
            ProjectedType::SpeculationConfirmed => "speculation_confirmed",
            ProjectedType::SpeculationAborted => "speculation_aborted",
            ProjectedType::Protocol(tag) => tag.as_str(),
        }
    }

    /// Domain category of the projection; doubles as the stored
    /// `source_event_type` filter tag.
    pub fn category(&self) -> &'static str {
        match self {
            ProjectedType::Discovered
            | ProjectedType::Claimed
            | ProjectedType::Completed
            | ProjectedType::Failed
            | ProjectedType::Disputed => "task",
            ProjectedType::DisputeInitiated
            | ProjectedType::DisputeVoteCast
            | ProjectedType::DisputeResolved
            | ProjectedType::DisputeCancelled
            | ProjectedType::DisputeExpired => "dispute",
            ProjectedType::SpeculationStarted
            | ProjectedType::SpeculationConfirmed
            | ProjectedType::SpeculationAborted => "speculation",
            ProjectedType::Protocol(_) => "protocol",
        }
    }
}

impl fmt::Display for ProjectedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectedType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s {
            "discovered" => ProjectedType::Discovered,
            "claimed" => ProjectedType::Claimed,
            "completed" => ProjectedType::Completed,
            "failed" => ProjectedType::Failed,
            "disputed" => ProjectedType::Disputed,
            "dispute:initiated" => ProjectedType::DisputeInitiated,
            "dispute:vote_cast" => ProjectedType::DisputeVoteCast,
            "dispute:resolved" => ProjectedType::DisputeResolved,
            "dispute:cancelled" => ProjectedType::DisputeCancelled,
            "dispute:expired" => ProjectedType::DisputeExpired,
            "speculation_started" => ProjectedType::SpeculationStarted,
            "speculation_confirmed" => ProjectedType::SpeculationConfirmed,
            "speculation_aborted" => ProjectedType::SpeculationAborted,
            other if other.starts_with("protocol:") => {
                ProjectedType::Protocol(other.to_string())
            }
            other => return Err(format!("unknown projected type tag: {}", other)),
        };
        Ok(parsed)
    }
}

impl Ord for ProjectedType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for ProjectedType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for ProjectedType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProjectedType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        tag.parse().map_err(serde::de::Error::custom)
    }
}

/// Canonical unit of the projected timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedTimelineEvent {
    pub seq: u64,
    #[serde(rename = "type")]
    pub event_type: ProjectedType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_pda: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispute_pda: Option<String>,
    pub slot: u64,
    pub signature: String,
    pub source_event_name: String,
    pub source_event_sequence: u64,
    pub timestamp_ms: i64,
    pub payload: Value,
    pub projection_hash: String,
}

/// Stored form of a projected event. The `source_event_type` tag is the
/// projection's domain category and participates in the store key, keeping
/// dual projections of a single raw event (`dispute:initiated` + `disputed`)
/// distinct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayTimelineRecord {
    pub source_event_type: String,
    #[serde(flatten)]
    pub event: ProjectedTimelineEvent,
}

impl ReplayTimelineRecord {
    pub fn from_event(event: ProjectedTimelineEvent) -> Self {
        Self {
            source_event_type: event.event_type.category().to_string(),
            event,
        }
    }

    /// Store identity key.
    pub fn store_key(&self) -> (u64, &str, &str) {
        (
            self.event.slot,
            self.event.signature.as_str(),
            self.source_event_type.as_str(),
        )
    }
}

/// Backfill checkpoint. Monotone in `(slot, signature)`; `event_name` is a
/// fetcher hint and does not participate in ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayEventCursor {
    pub slot: u64,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
}

impl ReplayEventCursor {
    pub fn new(slot: u64, signature: impl Into<String>) -> Self {
        Self {
            slot,
            signature: signature.into(),
            event_name: None,
        }
    }

    fn position(&self) -> (u64, &str) {
        (self.slot, self.signature.as_str())
    }
}

impl Ord for ReplayEventCursor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.position().cmp(&other.position())
    }
}

impl PartialOrd for ReplayEventCursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        let tags = [
            "discovered",
            "dispute:vote_cast",
            "speculation_aborted",
            "protocol:state_updated",
        ];
        for tag in tags {
            let parsed: ProjectedType = tag.parse().unwrap();
            assert_eq!(parsed.as_str(), tag);
        }
    }

    #[test]
    fn test_unknown_tag_rejected() {
        assert!("vanished".parse::<ProjectedType>().is_err());
    }

    #[test]
    fn test_ordering_is_lexicographic_over_tags() {
        let mut types = vec![
            ProjectedType::SpeculationStarted,
            ProjectedType::Discovered,
            ProjectedType::DisputeInitiated,
            ProjectedType::Claimed,
        ];
        types.sort();
        let tags: Vec<&str> = types.iter().map(|t| t.as_str()).collect();
        assert_eq!(
            tags,
            vec![
                "claimed",
                "discovered",
                "dispute:initiated",
                "speculation_started"
            ]
        );
    }

    #[test]
    fn test_cursor_ordering_ignores_event_name() {
        let mut a = ReplayEventCursor::new(5, "sig-a");
        a.event_name = Some("task_created".to_string());
        let b = ReplayEventCursor::new(5, "sig-a");
        assert_eq!(a.cmp(&b), Ordering::Equal);

        let later = ReplayEventCursor::new(6, "sig-a");
        assert!(later > a);
    }

    #[test]
    fn test_record_category_tag() {
        let event = ProjectedTimelineEvent {
            seq: 1,
            event_type: ProjectedType::DisputeInitiated,
            task_pda: None,
            dispute_pda: Some("d1".to_string()),
            slot: 10,
            signature: "sig".to_string(),
            source_event_name: "dispute_initiated".to_string(),
            source_event_sequence: 0,
            timestamp_ms: 0,
            payload: Value::Null,
            projection_hash: String::new(),
        };
        let record = ReplayTimelineRecord::from_event(event);
        assert_eq!(record.source_event_type, "dispute");
    }
}
