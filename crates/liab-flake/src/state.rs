use serde::{Deserialize, Serialize};

use crate::error::{FlakeError, FlakeResult};

/// Last issued generator state.
///
/// Absent state is equivalent to the default (zeros). The encoded form is a
/// fixed 12-byte bincode record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlakeState {
    /// Sequence issued at `last`.
    pub sequence: u32,
    /// Wall-clock milliseconds of the last issuance.
    pub last: u64,
}

impl FlakeState {
    pub fn new(sequence: u32, last: u64) -> Self {
        Self { sequence, last }
    }

    pub fn encode(&self) -> FlakeResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| FlakeError::CorruptState(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> FlakeResult<Self> {
        bincode::deserialize(bytes).map_err(|e| FlakeError::CorruptState(e.to_string()))
    }
}
