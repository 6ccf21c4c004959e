//! Transport layer for the otpkey token
//!
//! This crate provides the pieces every physical transport shares:
//! - Command buffer broker (one fixed buffer, one owner at a time)
//! - Command handler abstraction for processing commands in place
//! - WebUSB control-transfer state machine
//! - Direct one-shot exchange for NFC, contact and virtual card readers
//!
//! Register-level USB and NFC driving is left to the embedding firmware; these
//! types only see the bytes of each transfer.

pub mod broker;
pub mod direct;
pub mod error;
pub mod handler;
pub mod webusb;

// Re-export commonly used types
pub use broker::{BufferBroker, DEFAULT_BUFFER_SIZE, DEFAULT_HOLD_WINDOW_MS, Owner};
pub use direct::DirectTransport;
pub use error::{Error, Result};
pub use handler::{CommandHandler, Exchange};
pub use webusb::{Request, WebUsb, WebUsbState};
