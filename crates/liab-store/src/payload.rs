//! Entity payload encoding.
//!
//! Payloads are stored as JSON so that arbitrary structured records (maps,
//! text, numbers) can be read back without knowing the writer's type. Keys
//! never go through this module.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};

/// Value written for bucket membership. Only the key carries meaning.
pub const MARKER: &[u8] = b"";

pub fn encode<V: Serialize + ?Sized>(value: &V) -> StoreResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

pub fn decode<V: DeserializeOwned>(bytes: &[u8]) -> StoreResult<V> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}
