//! # otpkey
//!
//! An OATH HOTP/TOTP security token with touch-to-type output, usable as a
//! virtual card for client development and testing.
//!
//! ## Architecture
//!
//! - **Engine** (`otpkey-apdu`): command parsing, routing, the OATH
//!   credential application and the touch-output application
//! - **Transports** (`otpkey-transport`): the shared command buffer broker,
//!   WebUSB control transfers and one-shot card exchanges
//! - **Device**: the control loop over both, with a file-backed store
//!
//! ## Example
//!
//! ```no_run
//! # fn main() -> Result<(), otpkey::Error> {
//! use otpkey::{Device, DeviceConfig};
//!
//! let config = DeviceConfig::builder().storage_dir("/var/lib/otpkey").build();
//! let mut device = Device::open(config)?;
//!
//! // SELECT the OATH application
//! let response = device.exchange(&[0x00, 0xA4, 0x04, 0x00], 0)?;
//! # let _ = response;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod device;
pub mod error;
pub mod storage;

// Re-export main types at root level for convenience
pub use clock::SystemClock;
pub use config::{DeviceConfig, DeviceConfigBuilder};
pub use device::{Device, Tick};
pub use error::{Error, Result};
pub use storage::FileStore;

pub use otpkey_apdu::{Gesture, OathConfig, StatusCode};
pub use otpkey_transport::Owner;
