//! ISO 7816-4 status words
//!
//! Every response ends with one of these two-byte codes. The values are the
//! canonical smart-card ones so existing OATH clients keep working.

use core::fmt;

/// Status word high byte signalling "success, more bytes available"
pub const SW_BYTES_REMAINING: u16 = 0x6100;

/// Status words produced by the command router and its applications
///
/// `Success` is the only non-error value; continuation words (`0x61XX`) are
/// built with [`bytes_remaining`] because they carry a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum StatusCode {
    /// Command completed
    Success = 0x9000,

    /// Lc/Le or a TLV length is inconsistent with the supplied bytes
    WrongLength = 0x6700,

    /// Policy check failed (non-increasing challenge, presence refused)
    SecurityStatusNotSatisfied = 0x6982,

    /// Referenced data is invalid (binding to an unknown credential)
    DataInvalid = 0x6984,

    /// Precondition violated (duplicate name, nothing to continue)
    ConditionsNotSatisfied = 0x6985,

    /// Semantically invalid data field
    WrongData = 0x6A80,

    /// No free record slot
    NotEnoughSpace = 0x6A84,

    /// P1/P2 outside the accepted set
    WrongP1P2 = 0x6B00,

    /// Opcode not recognised
    InsNotSupported = 0x6D00,

    /// Persistence or internal failure
    Unknown = 0x6F00,
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Success => "Success",
            Self::WrongLength => "Wrong length",
            Self::SecurityStatusNotSatisfied => "Security status not satisfied",
            Self::DataInvalid => "Data invalid",
            Self::ConditionsNotSatisfied => "Conditions not satisfied",
            Self::WrongData => "Wrong data",
            Self::NotEnoughSpace => "Not enough space",
            Self::WrongP1P2 => "Wrong P1/P2",
            Self::InsNotSupported => "Instruction not supported",
            Self::Unknown => "Unknown error",
        };
        write!(f, "{} ({:04X})", msg, self.to_u16())
    }
}

/// Implement std::error::Error only when std is available
#[cfg(feature = "std")]
impl std::error::Error for StatusCode {}

impl StatusCode {
    /// Convert status code to its two-byte value
    pub fn to_u16(self) -> u16 {
        self as u16
    }
}

impl From<otpkey_crypto::CryptoError> for StatusCode {
    fn from(err: otpkey_crypto::CryptoError) -> Self {
        match err {
            otpkey_crypto::CryptoError::UnsupportedHash(_) => Self::WrongData,
            otpkey_crypto::CryptoError::InvalidKeyLength(_) => Self::Unknown,
        }
    }
}

/// `0x61XX` continuation word; counts above 255 saturate at `0x61FF`
pub fn bytes_remaining(remaining: usize) -> u16 {
    SW_BYTES_REMAINING | (remaining.min(0xFF) as u16)
}

/// Result type for APDU operations
pub type Result<T> = core::result::Result<T, StatusCode>;
