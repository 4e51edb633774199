//! Entity serialization to persisted bytes.
//!
//! Entities are encoded as CBOR, metadata included. The encoding must be
//! deterministic for a given entity value so that persisted bytes can be
//! compared and replayed.

use crate::error::{CoreError, CoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes an entity to its persisted byte form.
///
/// # Errors
///
/// Returns [`CoreError::Encoding`] if the entity cannot be serialized.
pub fn encode_entity<T: Serialize>(entity: &T) -> CoreResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(entity, &mut buf)
        .map_err(|e| CoreError::encoding(format!("serialize failed: {e}")))?;
    Ok(buf)
}

/// Decodes an entity from its persisted byte form.
///
/// # Errors
///
/// Returns [`CoreError::Encoding`] if the bytes are not a valid encoding
/// of `T`.
pub fn decode_entity<T: DeserializeOwned>(bytes: &[u8]) -> CoreResult<T> {
    ciborium::from_reader(bytes)
        .map_err(|e| CoreError::encoding(format!("deserialize failed: {e}")))
}
