//! Zeroizing storage for credential secrets and static passwords

use alloc::vec::Vec;
use core::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Secret bytes (HMAC keys, static passwords)
///
/// Wiped on drop, compared in constant time, and redacted in `Debug` output.
/// Serialized as a CBOR byte string.
#[derive(Clone)]
pub struct Secret {
    inner: Zeroizing<Vec<u8>>,
}

impl Secret {
    /// Move a vector into protected storage
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            inner: Zeroizing::new(data),
        }
    }

    /// Copy a slice into protected storage
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(data.to_vec())
    }

    /// Borrow the raw bytes
    ///
    /// Keep the borrow short; the slice itself is an ordinary reference.
    pub fn as_slice(&self) -> &[u8] {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("len", &self.len())
            .field("data", &"<redacted>")
            .finish()
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice().ct_eq(other.as_slice()).into()
    }
}

impl Eq for Secret {}

impl Serialize for Secret {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(self.as_slice())
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = serde_bytes::ByteBuf::deserialize(deserializer)?;
        Ok(Self::new(bytes.into_vec()))
    }
}
