use std::fmt;

use liab_types::TypeError;

/// Why the generator had to wait before retrying.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backoff {
    /// The persisted timestamp is ahead of the wall clock.
    ClockRegressed { wait_ms: u64 },
    /// Every sequence value of the current millisecond has been issued.
    SequenceExhausted { wait_ms: u64 },
}

impl Backoff {
    pub fn wait_ms(&self) -> u64 {
        match self {
            Backoff::ClockRegressed { wait_ms } | Backoff::SequenceExhausted { wait_ms } => *wait_ms,
        }
    }
}

impl fmt::Display for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backoff::ClockRegressed { wait_ms } => {
                write!(f, "clock is moving backwards, waiting {wait_ms}ms")
            }
            Backoff::SequenceExhausted { .. } => write!(f, "sequence overrun"),
        }
    }
}

/// Errors produced by the flake generator.
#[derive(Debug, thiserror::Error)]
pub enum FlakeError {
    /// The worker tag does not fit the configured layout.
    #[error("worker id {worker_id} out of range (max {max})")]
    WorkerOutOfRange { worker_id: u32, max: u32 },

    /// The layout is invalid or the clock is outside its representable range.
    #[error("flake layout error: {0}")]
    Layout(#[from] TypeError),

    /// The persisted generator state cannot be decoded.
    #[error("corrupt generator state: {0}")]
    CorruptState(String),

    /// A configured retry ceiling was hit while backing off.
    #[error("gave up after {attempts} attempts ({waited_ms}ms waited): {last}")]
    RetriesExhausted {
        attempts: u32,
        waited_ms: u64,
        last: Backoff,
    },
}

/// Convenience alias used throughout the flake crate.
pub type FlakeResult<T> = std::result::Result<T, FlakeError>;
