//! CBOR encoding of persisted documents using cbor4ii

use crate::status::{Result, StatusCode};

use alloc::vec::Vec;

use serde::{Serialize, de::DeserializeOwned};

/// Encode a value to CBOR bytes
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    cbor4ii::serde::to_vec(Vec::new(), value).map_err(|_| StatusCode::Unknown)
}

/// Decode CBOR bytes to a value
///
/// A document that does not decode is treated as storage corruption.
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    cbor4ii::serde::from_slice(data).map_err(|_| StatusCode::Unknown)
}
