//! HMAC over the hash variants an OATH credential can select
//!
//! RFC 2104 HMAC, used by RFC 4226 (HOTP) and RFC 6238 (TOTP).

use crate::error::{CryptoError, Result};

use core::ops::Deref;

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use zeroize::Zeroize;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

/// Largest MAC produced by any supported variant (SHA-512)
pub const MAX_MAC_LEN: usize = 64;

/// Hash variant identifiers as carried in the low nibble of the OATH key byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HashAlgorithm {
    Sha1 = 0x01,
    Sha256 = 0x02,
    Sha512 = 0x03,
}

impl HashAlgorithm {
    /// Convert to the wire identifier
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse a wire identifier
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::Sha1),
            0x02 => Ok(Self::Sha256),
            0x03 => Ok(Self::Sha512),
            other => Err(CryptoError::UnsupportedHash(other)),
        }
    }

    /// Length of the MAC this variant produces
    pub fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }
}

/// MAC bytes on the stack, wiped on drop
#[derive(Clone)]
pub struct MacOutput {
    bytes: [u8; MAX_MAC_LEN],
    len: usize,
}

impl MacOutput {
    fn new(mac: &[u8]) -> Self {
        let mut bytes = [0u8; MAX_MAC_LEN];
        bytes[..mac.len()].copy_from_slice(mac);
        Self {
            bytes,
            len: mac.len(),
        }
    }
}

impl Deref for MacOutput {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl Drop for MacOutput {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl core::fmt::Debug for MacOutput {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MacOutput").field("len", &self.len).finish()
    }
}

/// Compute HMAC(key, message) with the selected hash
///
/// # Examples
///
/// ```
/// use otpkey_crypto::{HashAlgorithm, hmac};
///
/// let mac = hmac(HashAlgorithm::Sha1, b"key", b"message").unwrap();
/// assert_eq!(mac.len(), 20);
/// ```
pub fn hmac(algorithm: HashAlgorithm, key: &[u8], message: &[u8]) -> Result<MacOutput> {
    match algorithm {
        HashAlgorithm::Sha1 => {
            let mut mac = HmacSha1::new_from_slice(key)
                .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
            mac.update(message);
            Ok(MacOutput::new(&mac.finalize().into_bytes()))
        }
        HashAlgorithm::Sha256 => {
            let mut mac = HmacSha256::new_from_slice(key)
                .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
            mac.update(message);
            Ok(MacOutput::new(&mac.finalize().into_bytes()))
        }
        HashAlgorithm::Sha512 => {
            let mut mac = HmacSha512::new_from_slice(key)
                .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
            mac.update(message);
            Ok(MacOutput::new(&mac.finalize().into_bytes()))
        }
    }
}
