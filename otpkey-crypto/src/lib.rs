//! Keyed-MAC primitives for OATH credentials
//!
//! The credential engine never touches a hash function directly. It asks this
//! crate for an HMAC over a challenge with one of the hash variants a
//! credential record may carry:
//!
//! - **HMAC-SHA-1**: RFC 4226 / RFC 6238 default
//! - **HMAC-SHA-256** and **HMAC-SHA-512**: RFC 6238 variants

#![cfg_attr(not(feature = "std"), no_std)]

pub mod error;
pub mod mac;

// Re-export commonly used types
pub use error::{CryptoError, Result};
pub use mac::{HashAlgorithm, MAX_MAC_LEN, MacOutput, hmac};
