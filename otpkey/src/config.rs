//! Device configuration

use otpkey_apdu::OathConfig;
use otpkey_transport::{DEFAULT_HOLD_WINDOW_MS, Owner};

use std::path::PathBuf;

/// Device configuration
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Directory holding credential and slot files
    pub storage_dir: PathBuf,
    /// Number of credential record slots in the store
    pub record_slots: usize,
    /// Parked-buffer inactivity window in milliseconds
    pub hold_window_ms: u64,
    /// Owner used for direct (card reader) exchanges
    pub card_owner: Owner,
    pub oath: OathConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("otpkey-data"),
            record_slots: 100,
            hold_window_ms: DEFAULT_HOLD_WINDOW_MS,
            card_owner: Owner::Virtual,
            oath: OathConfig::default(),
        }
    }
}

impl DeviceConfig {
    pub fn builder() -> DeviceConfigBuilder {
        DeviceConfigBuilder::default()
    }
}

/// Builder for DeviceConfig
#[derive(Default)]
pub struct DeviceConfigBuilder {
    config: DeviceConfig,
}

impl DeviceConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.storage_dir = dir.into();
        self
    }

    pub fn record_slots(mut self, slots: usize) -> Self {
        self.config.record_slots = slots;
        self
    }

    pub fn hold_window_ms(mut self, window: u64) -> Self {
        self.config.hold_window_ms = window;
        self
    }

    pub fn card_owner(mut self, owner: Owner) -> Self {
        self.config.card_owner = owner;
        self
    }

    pub fn oath(mut self, oath: OathConfig) -> Self {
        self.config.oath = oath;
        self
    }

    pub fn build(self) -> DeviceConfig {
        let mut config = self.config;
        if config.record_slots == 0 {
            config.record_slots = 1;
        }
        config
    }
}
