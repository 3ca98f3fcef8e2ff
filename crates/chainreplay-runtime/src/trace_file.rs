use std::path::Path;

use chainreplay_types::{canonical_parse, canonical_stringify, TrajectoryTrace};

use crate::error::{Error, Result};

/// Load a locally recorded trajectory. Missing or unreadable files map to
/// the `replay.trace_not_found` taxonomy code.
pub fn load_trajectory(path: &Path) -> Result<TrajectoryTrace> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::TraceNotFound(format!("{}: {}", path.display(), e)))?;
    let value = canonical_parse(&content)
        .map_err(|e| Error::TraceNotFound(format!("{}: {}", path.display(), e)))?;
    serde_json::from_value(value)
        .map_err(|e| Error::TraceNotFound(format!("{}: {}", path.display(), e)))
}

/// Persist a trajectory in canonical form, newline-terminated.
pub fn save_trajectory(path: &Path, trace: &TrajectoryTrace) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let value = serde_json::to_value(trace)?;
    let mut content = canonical_stringify(&value);
    content.push('\n');
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainreplay_types::{ProjectedType, TrajectoryEvent};
    use serde_json::json;

    fn sample_trace() -> TrajectoryTrace {
        TrajectoryTrace {
            schema_version: 1,
            trace_id: "trace-1".to_string(),
            seed: 7,
            created_at_ms: 1_000,
            events: vec![TrajectoryEvent {
                seq: 1,
                event_type: ProjectedType::Discovered,
                task_pda: Some("t1".to_string()),
                dispute_pda: None,
                timestamp_ms: 1_000,
                payload: json!({"task_id": "t1"}),
            }],
        }
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.json");

        let trace = sample_trace();
        save_trajectory(&path, &trace).unwrap();
        let loaded = load_trajectory(&path).unwrap();
        assert_eq!(loaded, trace);
    }

    #[test]
    fn test_missing_file_is_trace_not_found() {
        let error = load_trajectory(Path::new("/nonexistent/trace.json")).unwrap_err();
        assert_eq!(error.code(), "replay.trace_not_found");
        assert!(!error.retriable());
    }
}
