//! MessagePack encoding of per-session blobs

use formgate_core::{FormgateError, FormgateResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encode a value as a named-field MessagePack blob
pub fn encode<T: Serialize>(value: &T) -> FormgateResult<Vec<u8>> {
    rmp_serde::to_vec_named(value).map_err(|e| FormgateError::codec(e.to_string()))
}

/// Decode a MessagePack blob
pub fn decode<T: DeserializeOwned>(blob: &[u8]) -> FormgateResult<T> {
    rmp_serde::from_slice(blob).map_err(|e| FormgateError::codec(e.to_string()))
}
