//! Composite key encoding.
//!
//! A key is the plain concatenation of its parts: names contribute their raw
//! UTF-8 bytes, identifiers their fixed-width big-endian bytes, and nested
//! sequences their own concatenation. No separators or length prefixes are
//! written, so callers keep keys prefix-unambiguous by alternating name and
//! identifier segments.

use crate::config::FlakeConfig;
use crate::error::TypeError;
use crate::flake::Flake;

/// One segment of a composite key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Name(String),
    Id(Flake),
    Nested(Vec<KeyPart>),
}

impl From<&str> for KeyPart {
    fn from(name: &str) -> Self {
        KeyPart::Name(name.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(name: String) -> Self {
        KeyPart::Name(name)
    }
}

impl From<Flake> for KeyPart {
    fn from(id: Flake) -> Self {
        KeyPart::Id(id)
    }
}

impl From<Vec<KeyPart>> for KeyPart {
    fn from(parts: Vec<KeyPart>) -> Self {
        KeyPart::Nested(parts)
    }
}

/// Encodes key parts with a fixed identifier width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyCodec {
    id_width: usize,
}

impl Default for KeyCodec {
    fn default() -> Self {
        Self::CANONICAL
    }
}

impl KeyCodec {
    /// Codec for the canonical 7-byte identifier.
    pub const CANONICAL: KeyCodec = KeyCodec {
        id_width: Flake::WIDTH,
    };

    pub fn new(id_width: usize) -> Result<Self, TypeError> {
        if id_width == 0 || id_width > 8 {
            return Err(TypeError::InvalidLength {
                expected: Flake::WIDTH,
                actual: id_width,
            });
        }
        Ok(Self { id_width })
    }

    /// Codec matching a validated generator layout.
    pub fn for_config(config: &FlakeConfig) -> Result<Self, TypeError> {
        Self::new(config.byte_width)
    }

    pub fn id_width(&self) -> usize {
        self.id_width
    }

    /// Encode a sequence of parts into a single key.
    pub fn encode(&self, parts: &[KeyPart]) -> Vec<u8> {
        let mut out = Vec::new();
        for part in parts {
            self.encode_into(part, &mut out);
        }
        out
    }

    /// Append the encoding of one part to `out`.
    pub fn encode_into(&self, part: &KeyPart, out: &mut Vec<u8>) {
        match part {
            KeyPart::Name(name) => out.extend_from_slice(name.as_bytes()),
            KeyPart::Id(id) => out.extend_from_slice(&id.to_be_width(self.id_width)),
            KeyPart::Nested(parts) => {
                for p in parts {
                    self.encode_into(p, out);
                }
            }
        }
    }

    /// Decode an identifier segment. The slice must be exactly one identifier wide.
    pub fn decode_id(&self, bytes: &[u8]) -> Result<Flake, TypeError> {
        if bytes.len() != self.id_width {
            return Err(TypeError::InvalidLength {
                expected: self.id_width,
                actual: bytes.len(),
            });
        }
        Flake::from_slice(bytes)
    }

    /// The largest identifier segment, used as the upper bound of reverse seeks.
    pub fn id_upper_bound(&self) -> Vec<u8> {
        vec![0xFF; self.id_width]
    }

    /// If `key` is exactly `prefix` followed by one identifier, decode it.
    pub fn member_id(&self, prefix: &[u8], key: &[u8]) -> Option<Flake> {
        let rest = key.strip_prefix(prefix)?;
        if rest.len() != self.id_width {
            return None;
        }
        self.decode_id(rest).ok()
    }
}

/// Encode parts with the canonical identifier width.
pub fn encode_key(parts: &[KeyPart]) -> Vec<u8> {
    KeyCodec::CANONICAL.encode(parts)
}
