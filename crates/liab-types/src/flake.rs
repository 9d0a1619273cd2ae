use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::FlakeConfig;
use crate::error::TypeError;

/// Time-ordered unique identifier.
///
/// A `Flake` packs an epoch-relative millisecond timestamp, a worker tag and
/// a per-millisecond sequence into 56 bits. The canonical external form is 7
/// bytes big-endian, so byte-lexicographic order equals numeric order and
/// flakes can be used directly as sortable key segments.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Flake(u64);

/// The three fields of a [`Flake`] under a given [`FlakeConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlakeParts {
    /// Unix milliseconds (epoch already added back).
    pub timestamp_ms: u64,
    pub worker_id: u32,
    pub sequence: u32,
}

impl Flake {
    /// Canonical encoded width in bytes.
    pub const WIDTH: usize = 7;

    /// Largest identifier that fits the canonical 7 bytes (all 56 bits set).
    pub const MAX: Flake = Flake((1u64 << 56) - 1);

    /// Wrap a raw integer value.
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// The raw integer value.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Compose a flake from its fields.
    pub fn compose(
        config: &FlakeConfig,
        timestamp_ms: u64,
        worker_id: u32,
        sequence: u32,
    ) -> Result<Self, TypeError> {
        let elapsed = timestamp_ms
            .checked_sub(config.epoch_ms)
            .ok_or(TypeError::BeforeEpoch {
                timestamp_ms,
                epoch_ms: config.epoch_ms,
            })?;
        if elapsed > config.max_elapsed_ms() {
            return Err(TypeError::OutOfRange {
                field: "timestamp",
                value: elapsed,
                max: config.max_elapsed_ms(),
            });
        }
        if worker_id > config.max_worker_id() {
            return Err(TypeError::OutOfRange {
                field: "worker_id",
                value: worker_id.into(),
                max: config.max_worker_id().into(),
            });
        }
        if sequence > config.sequence_mask() {
            return Err(TypeError::OutOfRange {
                field: "sequence",
                value: sequence.into(),
                max: config.sequence_mask().into(),
            });
        }
        Ok(Self(
            (elapsed << config.timestamp_shift())
                | (u64::from(worker_id) << config.worker_shift())
                | u64::from(sequence),
        ))
    }

    /// Split into timestamp, worker tag and sequence.
    pub fn parts(&self, config: &FlakeConfig) -> FlakeParts {
        let worker_mask = u64::from(config.max_worker_id());
        FlakeParts {
            timestamp_ms: (self.0 >> config.timestamp_shift()) + config.epoch_ms,
            worker_id: ((self.0 >> config.worker_shift()) & worker_mask) as u32,
            sequence: (self.0 & u64::from(config.sequence_mask())) as u32,
        }
    }

    /// Issuance time in Unix milliseconds.
    pub fn to_timestamp(&self, config: &FlakeConfig) -> u64 {
        self.parts(config).timestamp_ms
    }

    /// Canonical 7-byte big-endian encoding.
    pub fn to_bytes(&self) -> [u8; Self::WIDTH] {
        let mut out = [0u8; Self::WIDTH];
        out.copy_from_slice(&self.0.to_be_bytes()[8 - Self::WIDTH..]);
        out
    }

    /// Big-endian encoding truncated to the low `width` bytes.
    ///
    /// `width` must be between 1 and 8; callers validate it up front.
    pub(crate) fn to_be_width(&self, width: usize) -> Vec<u8> {
        self.0.to_be_bytes()[8 - width..].to_vec()
    }

    /// Decode a big-endian identifier of 1 to 8 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.is_empty() || bytes.len() > 8 {
            return Err(TypeError::InvalidLength {
                expected: Self::WIDTH,
                actual: bytes.len(),
            });
        }
        let mut buf = [0u8; 8];
        buf[8 - bytes.len()..].copy_from_slice(bytes);
        Ok(Self(u64::from_be_bytes(buf)))
    }

    /// Hex of the canonical encoding: 14 characters, or 16 when the id
    /// needs the eighth byte (layouts with `byte_width = 8`).
    pub fn to_hex(&self) -> String {
        if self.0 > Self::MAX.0 {
            hex::encode(self.0.to_be_bytes())
        } else {
            hex::encode(self.to_bytes())
        }
    }

    /// Parse a 7- or 8-byte hex encoding.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != Self::WIDTH && bytes.len() != 8 {
            return Err(TypeError::InvalidLength {
                expected: Self::WIDTH,
                actual: bytes.len(),
            });
        }
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for Flake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Flake({})", self.to_hex())
    }
}

impl fmt::Display for Flake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Flake {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<Flake> for u64 {
    fn from(id: Flake) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const T0: u64 = crate::config::DEFAULT_EPOCH_MS + 1_000;

    // -----------------------------------------------------------------------
    // Layout
    // -----------------------------------------------------------------------

    #[test]
    fn compose_matches_bit_layout() {
        let c = FlakeConfig::default();
        let id = Flake::compose(&c, T0, 3, 5).unwrap();
        assert_eq!(id.as_u64(), (1_000 << 12) | (3 << 4) | 5);
    }

    #[test]
    fn parts_invert_compose() {
        let c = FlakeConfig::default();
        let id = Flake::compose(&c, T0, 255, 15).unwrap();
        let parts = id.parts(&c);
        assert_eq!(parts.timestamp_ms, T0);
        assert_eq!(parts.worker_id, 255);
        assert_eq!(parts.sequence, 15);
        assert_eq!(id.to_timestamp(&c), T0);
    }

    #[test]
    fn compose_rejects_worker_out_of_range() {
        let c = FlakeConfig::default();
        let err = Flake::compose(&c, T0, 256, 0).unwrap_err();
        assert!(matches!(err, TypeError::OutOfRange { field: "worker_id", .. }));
    }

    #[test]
    fn compose_rejects_sequence_out_of_range() {
        let c = FlakeConfig::default();
        assert!(Flake::compose(&c, T0, 0, 16).is_err());
    }

    #[test]
    fn compose_rejects_pre_epoch_timestamp() {
        let c = FlakeConfig::default();
        let err = Flake::compose(&c, c.epoch_ms - 1, 0, 0).unwrap_err();
        assert!(matches!(err, TypeError::BeforeEpoch { .. }));
    }

    // -----------------------------------------------------------------------
    // Encoding
    // -----------------------------------------------------------------------

    #[test]
    fn max_is_all_ones() {
        assert_eq!(Flake::MAX.to_bytes(), [0xFF; 7]);
    }

    #[test]
    fn to_bytes_is_big_endian() {
        let id = Flake::from_raw(0x01_02_03_04_05_06_07);
        assert_eq!(id.to_bytes(), [1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn from_slice_rejects_bad_length() {
        assert!(Flake::from_slice(&[]).is_err());
        assert!(Flake::from_slice(&[0; 9]).is_err());
    }

    #[test]
    fn hex_roundtrip() {
        let id = Flake::from_raw(0xABCDEF);
        let hex = id.to_hex();
        assert_eq!(hex.len(), 14);
        assert_eq!(hex.parse::<Flake>().unwrap(), id);
    }

    #[test]
    fn eight_byte_layout_keeps_the_high_byte_in_hex() {
        let c = FlakeConfig {
            worker_bits: 8,
            sequence_bits: 16,
            byte_width: 8,
            ..Default::default()
        };
        let id = Flake::compose(&c, c.epoch_ms + 380_000_000_000, 7, 9).unwrap();
        assert!(id > Flake::MAX);

        let hex = id.to_hex();
        assert_eq!(hex.len(), 16);
        let parsed: Flake = hex.parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(parsed.parts(&c).worker_id, 7);
        assert_eq!(format!("{id:?}"), format!("Flake({hex})"));
    }

    #[test]
    fn from_hex_rejects_wrong_width() {
        let err = Flake::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 7,
                actual: 2
            }
        );
    }

    #[test]
    fn display_is_hex() {
        let id = Flake::from_raw(1);
        assert_eq!(format!("{id}"), "00000000000001");
        assert_eq!(format!("{id:?}"), "Flake(00000000000001)");
    }

    #[test]
    fn serde_roundtrip() {
        let id = Flake::from_raw(42);
        let json = serde_json::to_string(&id).unwrap();
        let parsed: Flake = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    proptest! {
        #[test]
        fn hex_inverts_for_every_u64(raw in any::<u64>()) {
            let id = Flake::from_raw(raw);
            prop_assert_eq!(Flake::from_hex(&id.to_hex()).unwrap(), id);
        }

        #[test]
        fn decode_inverts_encode(raw in 0u64..(1u64 << 56)) {
            let id = Flake::from_raw(raw);
            prop_assert_eq!(Flake::from_slice(&id.to_bytes()).unwrap(), id);
        }

        #[test]
        fn byte_order_matches_numeric_order(a in 0u64..(1u64 << 56), b in 0u64..(1u64 << 56)) {
            let (fa, fb) = (Flake::from_raw(a), Flake::from_raw(b));
            prop_assert_eq!(fa.cmp(&fb), fa.to_bytes().cmp(&fb.to_bytes()));
        }
    }
}
