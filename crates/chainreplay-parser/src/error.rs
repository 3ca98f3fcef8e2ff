use std::fmt;

/// Result type for chainreplay-parser operations
pub type Result<T> = std::result::Result<T, Error>;

/// Parse failure taxonomy. The three kinds are part of the telemetry
/// contract and surface verbatim in strict-mode projection failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A required field is absent from the decoded payload
    MissingField(String),

    /// A byte-array field has the wrong element count
    WrongArity {
        field: String,
        expected: usize,
        actual: usize,
    },

    /// A field exists but its bytes or encoding are not decodable
    InvalidBytes(String),
}

impl Error {
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MissingField(_) => "missing_field",
            Error::WrongArity { .. } => "wrong_arity",
            Error::InvalidBytes(_) => "invalid_bytes",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingField(field) => write!(f, "missing_field: {}", field),
            Error::WrongArity {
                field,
                expected,
                actual,
            } => write!(
                f,
                "wrong_arity: {} (expected {} bytes, got {})",
                field, expected, actual
            ),
            Error::InvalidBytes(detail) => write!(f, "invalid_bytes: {}", detail),
        }
    }
}

impl std::error::Error for Error {}
