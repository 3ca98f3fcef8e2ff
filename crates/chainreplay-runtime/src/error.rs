use std::fmt;

use chainreplay_engine::StrictProjectionError;

/// Result type for chainreplay-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Runtime error taxonomy. `code()` values are stable identifiers that
/// surface verbatim in error envelopes; `retriable()` tells the caller
/// whether re-invocation without modification can succeed.
#[derive(Debug)]
pub enum Error {
    /// Raw event failed its schema in strict mode
    Parse(chainreplay_parser::Error),

    /// State-machine violation in strict mode
    ProjectionStrict(StrictProjectionError),

    /// Storage layer failure (including cursor regressions)
    Store(chainreplay_store::Error),

    /// Fetcher failure; the enclosing runtime may retry by re-invocation
    Fetch(String),

    /// A policy cap tripped
    LimitsExceeded(String),

    /// Authorization denied
    AccessDenied(String),

    /// Local trace file missing or unreadable
    TraceNotFound(String),

    /// Evidence pack hash check failed
    EvidenceIntegrity(Vec<String>),

    /// Strict comparison found divergences
    CompareMismatch { mismatch_count: usize },

    /// Configuration error
    Config(String),

    /// IO operation failed
    Io(std::io::Error),

    /// JSON (de)serialization failed
    Json(serde_json::Error),

    /// Cancellation token fired
    Cancelled,
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::Parse(_) => "replay.parse_failed",
            Error::ProjectionStrict(_) => "replay.projection_strict_failure",
            Error::Store(chainreplay_store::Error::CursorRegression { .. }) => {
                "replay.cursor_regression"
            }
            Error::Store(_) => "replay.store_write_failed",
            Error::Fetch(_) => "replay.fetch_failed",
            Error::LimitsExceeded(_) => "replay.limits_exceeded",
            Error::AccessDenied(_) => "replay.access_denied",
            Error::TraceNotFound(_) => "replay.trace_not_found",
            Error::EvidenceIntegrity(_) => "replay.evidence_integrity_failed",
            Error::CompareMismatch { .. } => "replay.compare_mismatch",
            Error::Config(_) => "replay.config_invalid",
            Error::Io(_) | Error::Json(_) => "replay.internal_error",
            Error::Cancelled => "replay.cancelled",
        }
    }

    pub fn retriable(&self) -> bool {
        matches!(
            self,
            Error::Fetch(_) | Error::Store(chainreplay_store::Error::Database(_))
        ) || matches!(self, Error::Store(chainreplay_store::Error::Io(_)))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse(err) => write!(f, "Parse error: {}", err),
            Error::ProjectionStrict(err) => write!(f, "Strict projection failure: {}", err),
            Error::Store(err) => write!(f, "Store error: {}", err),
            Error::Fetch(msg) => write!(f, "Fetch error: {}", msg),
            Error::LimitsExceeded(msg) => write!(f, "Limits exceeded: {}", msg),
            Error::AccessDenied(msg) => write!(f, "Access denied: {}", msg),
            Error::TraceNotFound(msg) => write!(f, "Trace not found: {}", msg),
            Error::EvidenceIntegrity(errors) => {
                write!(f, "Evidence integrity failed: {}", errors.join("; "))
            }
            Error::CompareMismatch { mismatch_count } => {
                write!(
                    f,
                    "Strict comparison found {} divergences",
                    mismatch_count
                )
            }
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Json(err) => write!(f, "JSON error: {}", err),
            Error::Cancelled => write!(f, "Operation cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::ProjectionStrict(err) => Some(err),
            Error::Store(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<chainreplay_parser::Error> for Error {
    fn from(err: chainreplay_parser::Error) -> Self {
        Error::Parse(err)
    }
}

impl From<StrictProjectionError> for Error {
    fn from(err: StrictProjectionError) -> Self {
        Error::ProjectionStrict(err)
    }
}

impl From<chainreplay_store::Error> for Error {
    fn from(err: chainreplay_store::Error) -> Self {
        Error::Store(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}
