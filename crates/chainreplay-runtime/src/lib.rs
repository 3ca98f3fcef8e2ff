mod alerts;
mod backfill;
mod cancel;
mod config;
mod envelope;
mod error;
mod evidence_io;
mod fetcher;
mod ops;
mod policy;
mod trace_file;

pub use alerts::{AlertAdapter, AlertContext, AlertDispatcher, AlertDispatcherConfig};
pub use backfill::{
    BackfillOptions, BackfillProgress, BackfillReport, BackfillService,
    ALERT_INGESTION_LAG, ALERT_STORE_WRITE_FAILED,
};
pub use cancel::CancelToken;
pub use config::{BackfillConfig, ReplayConfig, StoreConfig, StoreType};
pub use envelope::error_envelope;
pub use error::{Error, Result};
pub use evidence_io::{
    read_evidence_pack, write_evidence_pack, CASE_FILE, EVENTS_FILE, MANIFEST_FILE,
};
pub use fetcher::{EventPage, PageFetcher};
pub use ops::{AuthContext, BackfillParams, CompareParams, IncidentParams, ToolRuntime};
pub use policy::{
    check_access, is_high_risk, resolve_actor, risk_level, Actor, AuditEntry, EffectiveCaps,
    ReplayPolicy,
};
pub use trace_file::{load_trajectory, save_trajectory};
