use std::fmt;

use chainreplay_types::ReplayEventCursor;

/// Result type for chainreplay-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the storage layer
#[derive(Debug)]
pub enum Error {
    /// Database operation failed
    Database(rusqlite::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// Attempted to persist a cursor behind the last checkpoint
    CursorRegression {
        previous: ReplayEventCursor,
        attempted: ReplayEventCursor,
    },

    /// Stored data failed to round-trip (schema drift, manual edits)
    Corrupt(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Database(err) => write!(f, "Database error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::CursorRegression {
                previous,
                attempted,
            } => write!(
                f,
                "Cursor regression: attempted ({}, {}) behind persisted ({}, {})",
                attempted.slot, attempted.signature, previous.slot, previous.signature
            ),
            Error::Corrupt(msg) => write!(f, "Corrupt record: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Database(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::CursorRegression { .. } | Error::Corrupt(_) => None,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
