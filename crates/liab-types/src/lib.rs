//! Foundation types for liab.
//!
//! This crate provides the identifier and key types shared by every other
//! liab crate. Nothing here touches storage or the clock.
//!
//! # Key Types
//!
//! - [`Flake`] - Time-ordered 56-bit identifier, canonically 7 bytes big-endian
//! - [`FlakeConfig`] - Bit layout and epoch used to compose and decompose flakes
//! - [`KeyPart`] / [`KeyCodec`] - Deterministic composite key encoding

pub mod config;
pub mod error;
pub mod flake;
pub mod key;

pub use config::FlakeConfig;
pub use error::TypeError;
pub use flake::{Flake, FlakeParts};
pub use key::{encode_key, KeyCodec, KeyPart};
