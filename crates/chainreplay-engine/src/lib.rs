pub mod compare;
pub mod incident;
pub mod projector;

pub use compare::{
    compare_trajectory, CompareOptions, CompareStatus, ComparisonReport, Strictness,
};
pub use incident::{
    build_evidence_pack, build_incident_case, event_to_value, verify_evidence_pack_integrity,
    EvidenceOptions, IncidentInput,
};
pub use projector::{
    project, ProjectionMode, ProjectionOptions, ProjectionOutput, ProjectionTelemetry,
    StrictProjectionError,
};
