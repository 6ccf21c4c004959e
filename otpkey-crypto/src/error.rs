//! Error types for keyed-MAC operations

#[cfg(feature = "std")]
use thiserror::Error;

#[cfg(not(feature = "std"))]
use core::fmt;

/// Keyed-MAC operation errors
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Hash identifier is not one of the supported variants
    #[error("Unsupported hash algorithm: 0x{0:02X}")]
    UnsupportedHash(u8),

    /// Key rejected by the MAC implementation
    #[error("Invalid key length: {0}")]
    InvalidKeyLength(usize),
}

/// Keyed-MAC operation errors (no_std version)
#[cfg(not(feature = "std"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// Hash identifier is not one of the supported variants
    UnsupportedHash(u8),

    /// Key rejected by the MAC implementation
    InvalidKeyLength(usize),
}

#[cfg(not(feature = "std"))]
impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedHash(id) => write!(f, "Unsupported hash algorithm: 0x{:02X}", id),
            Self::InvalidKeyLength(len) => write!(f, "Invalid key length: {}", len),
        }
    }
}

/// Result type alias for keyed-MAC operations
pub type Result<T> = core::result::Result<T, CryptoError>;
