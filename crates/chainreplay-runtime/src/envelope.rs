use serde_json::{json, Value};

use crate::error::Error;

/// Shared error envelope. Every tool returns either its documented success
/// schema or this shape; `retriable` is truthy iff re-invocation without
/// modification can succeed.
pub fn error_envelope(command: &str, schema: &str, error: &Error) -> Value {
    let mut envelope = json!({
        "status": "error",
        "command": command,
        "schema": schema,
        "code": error.code(),
        "message": error.to_string(),
        "retriable": error.retriable(),
    });
    if let Error::EvidenceIntegrity(errors) = error {
        envelope["details"] = json!(errors);
    }
    envelope
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_shape() {
        let envelope = error_envelope(
            "replay.compare",
            "replay.compare.output.v1",
            &Error::TraceNotFound("trace.json".to_string()),
        );
        assert_eq!(envelope["status"], "error");
        assert_eq!(envelope["code"], "replay.trace_not_found");
        assert_eq!(envelope["retriable"], false);
    }

    #[test]
    fn test_fetch_errors_are_retriable() {
        let envelope = error_envelope(
            "replay.backfill",
            "replay.backfill.output.v1",
            &Error::Fetch("rpc timeout".to_string()),
        );
        assert_eq!(envelope["retriable"], true);
    }
}
