use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("{field} out of range: {value} exceeds {max}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },

    #[error("timestamp {timestamp_ms}ms precedes epoch {epoch_ms}ms")]
    BeforeEpoch { timestamp_ms: u64, epoch_ms: u64 },

    #[error("invalid flake layout: {0}")]
    InvalidConfig(String),
}
