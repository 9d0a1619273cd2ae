use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Wed, 15 Oct 2014 11:00:00.000 GMT.
pub const DEFAULT_EPOCH_MS: u64 = 1_413_370_800_000;

/// Bit layout of a [`Flake`](crate::Flake).
///
/// A flake is `(timestamp_ms - epoch_ms) << (worker_bits + sequence_bits)
/// | worker_id << sequence_bits | sequence`, stored in `byte_width` bytes
/// big-endian. Whatever bits remain after the worker and sequence fields
/// hold the timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlakeConfig {
    /// Reference timestamp subtracted before encoding.
    pub epoch_ms: u64,
    /// Width of the worker tag.
    pub worker_bits: u32,
    /// Width of the per-millisecond sequence.
    pub sequence_bits: u32,
    /// Encoded width of an identifier in bytes.
    pub byte_width: usize,
}

impl Default for FlakeConfig {
    fn default() -> Self {
        Self {
            epoch_ms: DEFAULT_EPOCH_MS,
            worker_bits: 8,
            sequence_bits: 4,
            byte_width: 7,
        }
    }
}

impl FlakeConfig {
    /// Check that the layout leaves room for a timestamp and fits in a `u64`.
    pub fn validate(&self) -> Result<(), TypeError> {
        if self.byte_width == 0 || self.byte_width > 8 {
            return Err(TypeError::InvalidConfig(format!(
                "byte_width must be between 1 and 8, got {}",
                self.byte_width
            )));
        }
        if self.sequence_bits == 0 {
            return Err(TypeError::InvalidConfig(
                "sequence_bits must be at least 1".into(),
            ));
        }
        if self.sequence_bits > 32 || self.worker_bits > 32 {
            return Err(TypeError::InvalidConfig(
                "worker_bits and sequence_bits must each fit in 32 bits".into(),
            ));
        }
        let total = self.byte_width as u32 * 8;
        if self.worker_bits + self.sequence_bits >= total {
            return Err(TypeError::InvalidConfig(format!(
                "worker_bits ({}) + sequence_bits ({}) leave no timestamp bits in {} bytes",
                self.worker_bits, self.sequence_bits, self.byte_width
            )));
        }
        Ok(())
    }

    /// Left shift applied to the epoch-relative timestamp.
    pub fn timestamp_shift(&self) -> u32 {
        self.worker_bits + self.sequence_bits
    }

    /// Left shift applied to the worker tag.
    pub fn worker_shift(&self) -> u32 {
        self.sequence_bits
    }

    /// Number of bits available for the timestamp.
    pub fn timestamp_bits(&self) -> u32 {
        self.byte_width as u32 * 8 - self.timestamp_shift()
    }

    pub fn sequence_mask(&self) -> u32 {
        low_bits(self.sequence_bits) as u32
    }

    pub fn max_worker_id(&self) -> u32 {
        low_bits(self.worker_bits) as u32
    }

    /// Largest epoch-relative timestamp that still fits.
    pub fn max_elapsed_ms(&self) -> u64 {
        low_bits(self.timestamp_bits())
    }
}

fn low_bits(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout() {
        let c = FlakeConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.timestamp_shift(), 12);
        assert_eq!(c.worker_shift(), 4);
        assert_eq!(c.sequence_mask(), 0xF);
        assert_eq!(c.max_worker_id(), 255);
        assert_eq!(c.timestamp_bits(), 44);
    }

    #[test]
    fn rejects_zero_width() {
        let c = FlakeConfig {
            byte_width: 0,
            ..Default::default()
        };
        assert!(matches!(c.validate(), Err(TypeError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_wide_layout() {
        let c = FlakeConfig {
            byte_width: 9,
            ..Default::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_layout_without_timestamp_bits() {
        let c = FlakeConfig {
            worker_bits: 30,
            sequence_bits: 26,
            byte_width: 7,
            ..Default::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_empty_sequence() {
        let c = FlakeConfig {
            sequence_bits: 0,
            ..Default::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn full_width_layout_is_valid() {
        let c = FlakeConfig {
            byte_width: 8,
            ..Default::default()
        };
        assert!(c.validate().is_ok());
        assert_eq!(c.timestamp_bits(), 52);
    }

    #[test]
    fn deserializes_partial_config() {
        let c: FlakeConfig = serde_json::from_str(r#"{"worker_bits": 6}"#).unwrap();
        assert_eq!(c.worker_bits, 6);
        assert_eq!(c.epoch_ms, DEFAULT_EPOCH_MS);
        assert_eq!(c.byte_width, 7);
    }
}
