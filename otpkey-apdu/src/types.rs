//! Credential records, touch slots and gestures
//!
//! Everything here is persisted through [`crate::store::CredentialStore`] as
//! CBOR, so every type derives `Serialize`/`Deserialize`.

use crate::secret::Secret;

use alloc::vec::Vec;

use otpkey_crypto::HashAlgorithm;
use serde::{Deserialize, Serialize};

/// Longest credential name
pub const MAX_NAME_LEN: usize = 64;

/// Longest HMAC secret
pub const MAX_KEY_LEN: usize = 64;

/// Longest static password a touch slot can hold
pub const MAX_PASSWORD_LEN: usize = 32;

/// One-time-password flavour, high nibble of the algorithm byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpKind {
    /// RFC 4226 counter based
    Hotp,
    /// RFC 6238 time based
    Totp,
}

impl OtpKind {
    const HOTP: u8 = 0x10;
    const TOTP: u8 = 0x20;
}

/// Algorithm byte: OTP flavour plus hash variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub struct Algorithm {
    pub kind: OtpKind,
    pub hash: HashAlgorithm,
}

impl Algorithm {
    pub fn new(kind: OtpKind, hash: HashAlgorithm) -> Self {
        Self { kind, hash }
    }

    /// Decode a wire byte, `None` for unsupported combinations
    pub fn from_u8(value: u8) -> Option<Self> {
        let kind = match value & 0xF0 {
            OtpKind::HOTP => OtpKind::Hotp,
            OtpKind::TOTP => OtpKind::Totp,
            _ => return None,
        };
        let hash = HashAlgorithm::from_u8(value & 0x0F).ok()?;
        Some(Self { kind, hash })
    }

    pub fn to_u8(self) -> u8 {
        let kind = match self.kind {
            OtpKind::Hotp => OtpKind::HOTP,
            OtpKind::Totp => OtpKind::TOTP,
        };
        kind | self.hash.to_u8()
    }
}

impl From<Algorithm> for u8 {
    fn from(algorithm: Algorithm) -> u8 {
        algorithm.to_u8()
    }
}

impl TryFrom<u8> for Algorithm {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or("unsupported algorithm byte")
    }
}

/// Credential property bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(u8);

impl Properties {
    /// Every calculation needs a touch
    pub const REQUIRES_TOUCH: u8 = 0x01;
    /// Challenges must strictly increase
    pub const INCREASING_ONLY: u8 = 0x02;

    const KNOWN: u8 = Self::REQUIRES_TOUCH | Self::INCREASING_ONLY;

    /// Keep the recognised bits of a wire byte
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & Self::KNOWN)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn requires_touch(self) -> bool {
        self.0 & Self::REQUIRES_TOUCH != 0
    }

    pub fn increasing_only(self) -> bool {
        self.0 & Self::INCREASING_ONLY != 0
    }
}

/// A stored OATH credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Unique among live records
    #[serde(with = "serde_bytes")]
    pub name: Vec<u8>,

    pub algorithm: Algorithm,

    /// 6, 7 or 8
    pub digits: u8,

    pub secret: Secret,

    /// HOTP: last counter value used. Increasing-only: last accepted challenge.
    pub counter: u64,

    pub properties: Properties,
}

impl CredentialRecord {
    pub fn is_hotp(&self) -> bool {
        self.algorithm.kind == OtpKind::Hotp
    }
}

/// Physical gesture reported by the touch sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Gesture {
    Short = 1,
    Long = 2,
}

impl Gesture {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Short),
            2 => Some(Self::Long),
            _ => None,
        }
    }

    /// Index into [`SlotTable`]
    pub fn slot_index(self) -> usize {
        self as usize - 1
    }
}

/// What a touch slot emits
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SlotKind {
    #[default]
    Off,
    /// Code of the named credential, resolved on every touch
    Oath {
        #[serde(with = "serde_bytes")]
        name: Vec<u8>,
    },
    /// Fixed password bytes
    Static { password: Secret },
}

impl SlotKind {
    pub const OFF: u8 = 0;
    pub const OATH: u8 = 1;
    pub const STATIC: u8 = 2;

    pub fn type_byte(&self) -> u8 {
        match self {
            Self::Off => Self::OFF,
            Self::Oath { .. } => Self::OATH,
            Self::Static { .. } => Self::STATIC,
        }
    }
}

/// One gesture binding
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TouchSlot {
    pub kind: SlotKind,
    /// Append `'\r'` after the output
    pub with_enter: bool,
}

/// Both gesture bindings, persisted as a single document
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlotTable {
    pub slots: [TouchSlot; 2],
}

impl SlotTable {
    pub fn get(&self, gesture: Gesture) -> &TouchSlot {
        &self.slots[gesture.slot_index()]
    }

    pub fn get_mut(&mut self, gesture: Gesture) -> &mut TouchSlot {
        &mut self.slots[gesture.slot_index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_byte() {
        let alg = Algorithm::from_u8(0x21).unwrap();
        assert_eq!(alg.kind, OtpKind::Totp);
        assert_eq!(alg.hash, HashAlgorithm::Sha1);
        assert_eq!(alg.to_u8(), 0x21);

        assert_eq!(Algorithm::from_u8(0x13).unwrap().hash, HashAlgorithm::Sha512);
        assert!(Algorithm::from_u8(0x00).is_none());
        assert!(Algorithm::from_u8(0x30).is_none());
        assert!(Algorithm::from_u8(0x14).is_none());
    }

    #[test]
    fn test_properties() {
        let props = Properties::from_bits(0x03);
        assert!(props.requires_touch());
        assert!(props.increasing_only());
        assert_eq!(Properties::from_bits(0xF0).bits(), 0);
        assert!(!Properties::from_bits(0x02).requires_touch());
    }

    #[test]
    fn test_gesture_slots() {
        assert_eq!(Gesture::from_u8(1), Some(Gesture::Short));
        assert_eq!(Gesture::from_u8(199), None);
        assert_eq!(Gesture::Long.slot_index(), 1);
    }

    #[test]
    fn test_record_cbor() {
        let record = CredentialRecord {
            name: b"abc".to_vec(),
            algorithm: Algorithm::new(OtpKind::Hotp, HashAlgorithm::Sha256),
            digits: 8,
            secret: Secret::from_slice(&[1, 2, 3]),
            counter: 41,
            properties: Properties::from_bits(Properties::INCREASING_ONLY),
        };
        let bytes = cbor4ii::serde::to_vec(Vec::new(), &record).unwrap();
        let decoded: CredentialRecord = cbor4ii::serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_slot_table_cbor() {
        let mut table = SlotTable::default();
        table.get_mut(Gesture::Long).kind = SlotKind::Static {
            password: Secret::from_slice(b"pw"),
        };
        table.get_mut(Gesture::Long).with_enter = true;
        let bytes = cbor4ii::serde::to_vec(Vec::new(), &table).unwrap();
        let decoded: SlotTable = cbor4ii::serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded, table);
        assert_eq!(decoded.get(Gesture::Short).kind, SlotKind::Off);
    }
}
