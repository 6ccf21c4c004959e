//! Smart-card command engine for the otpkey token
//!
//! This crate holds the protocol side of the device: ISO 7816-4 command
//! parsing, the command router, the OATH HOTP/TOTP credential application and
//! the touch-output application that types codes or static passwords on a
//! gesture.
//!
//! The crate is `no_std` + `alloc` capable; the `std` feature is on by default.
//! Persistence and time are injected through the [`CredentialStore`] and
//! [`Clock`] traits.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod apdu;
#[cfg(feature = "transport")]
pub mod bridge;
pub mod cbor;
pub mod commands;
pub mod dispatcher;
pub mod oath;
pub mod pass;
pub mod presence;
pub mod secret;
pub mod status;
pub mod store;
pub mod tlv;
pub mod types;

// Re-export commonly used types
pub use apdu::{Command, Response};
#[cfg(feature = "transport")]
pub use bridge::TransportBridge;
pub use commands::Instruction;
pub use dispatcher::{CommandDispatcher, Dispatch};
pub use oath::{Oath, OathConfig, OtpCode};
pub use pass::{Pass, TouchOutput};
pub use presence::{PresenceState, PresenceWait};
pub use secret::Secret;
pub use status::{Result, StatusCode};
pub use store::{Clock, CredentialStore, FixedClock, MemoryStore};
pub use types::{
    Algorithm, CredentialRecord, Gesture, OtpKind, Properties, SlotKind, SlotTable, TouchSlot,
};
