//! Device control loop
//!
//! Ties the command buffer, the transports and the command engine together.
//! The firmware main loop, or the virtual card binary, calls [`Device::tick`]
//! repeatedly with the current time in milliseconds and any gesture the touch
//! sensor reported since the previous tick. Transport events are fed in
//! between ticks through the `webusb_*` methods and [`Device::exchange`].

use crate::clock::SystemClock;
use crate::config::DeviceConfig;
use crate::error::Result;
use crate::storage::FileStore;

use otpkey_apdu::{
    Clock, CommandDispatcher, CredentialStore, Gesture, TouchOutput, TransportBridge,
};
use otpkey_transport::{BufferBroker, DirectTransport, WebUsb};

use log::{debug, info};

/// What one tick produced
#[derive(Default)]
pub struct Tick {
    /// Characters to type for a gesture
    pub typed: Option<TouchOutput>,
    /// Response of a card exchange that was waiting for presence
    pub card_response: Option<Vec<u8>>,
}

/// A complete token: shared buffer, transports and applications
pub struct Device<S: CredentialStore, K: Clock> {
    broker: BufferBroker,
    bridge: TransportBridge<S, K>,
    webusb: WebUsb,
    card: DirectTransport,
}

impl Device<FileStore, SystemClock> {
    /// Open the device on the file store named in `config`
    pub fn open(config: DeviceConfig) -> Result<Self> {
        let store = FileStore::open(&config.storage_dir, config.record_slots)?;
        Self::with_store(config, store, SystemClock)
    }
}

impl<S: CredentialStore, K: Clock> Device<S, K> {
    pub fn with_store(config: DeviceConfig, store: S, clock: K) -> Result<Self> {
        let dispatcher = CommandDispatcher::new(config.oath.clone(), store, clock)?;
        info!("device ready, card transport {:?}", config.card_owner);
        Ok(Self {
            broker: BufferBroker::new().with_hold_window(config.hold_window_ms),
            bridge: TransportBridge::new(dispatcher),
            webusb: WebUsb::new(),
            card: DirectTransport::new(config.card_owner),
        })
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<S, K> {
        self.bridge.dispatcher()
    }

    pub fn broker(&self) -> &BufferBroker {
        &self.broker
    }

    pub fn webusb(&self) -> &WebUsb {
        &self.webusb
    }

    /// Card reader exchange
    ///
    /// Returns `None` while the command waits for presence; the response then
    /// arrives in [`Tick::card_response`].
    pub fn exchange(&mut self, command: &[u8], now: u64) -> Result<Option<Vec<u8>>> {
        Ok(self
            .card
            .exchange(&mut self.broker, &mut self.bridge, command, now)?)
    }

    /// Raw WebUSB vendor control request, decoded from `bRequest`
    pub fn webusb_control(
        &mut self,
        b_request: u8,
        w_length: usize,
        data: &[u8],
        now: u64,
    ) -> Result<Vec<u8>> {
        Ok(self
            .webusb
            .control(&mut self.broker, b_request, w_length, data, now)?)
    }

    /// WebUSB `CMD` request with its data stage
    pub fn webusb_command(&mut self, data: &[u8], now: u64) -> Result<()> {
        Ok(self.webusb.command(&mut self.broker, data, now)?)
    }

    /// WebUSB `STAT` request
    pub fn webusb_status(&mut self, now: u64) -> u8 {
        self.webusb.status(&mut self.broker, now)
    }

    /// WebUSB `RESP` request, completed once the bytes are handed out
    pub fn webusb_response(&mut self, w_length: usize, now: u64) -> Result<Vec<u8>> {
        let response = self.webusb.response(&mut self.broker, w_length, now)?;
        self.webusb.response_sent(&mut self.broker, now)?;
        Ok(response)
    }

    /// One control-loop step
    ///
    /// A gesture confirms presence when a command is waiting for it and only
    /// triggers touch output otherwise.
    pub fn tick(&mut self, now: u64, gesture: Option<Gesture>) -> Result<Tick> {
        let presence = gesture.is_some() && self.bridge.dispatcher().is_waiting();
        if presence {
            debug!("gesture taken as presence confirmation");
        }

        // Only the lease holder can be waiting, so at most one of these
        // consumes the presence
        self.webusb
            .poll(&mut self.broker, &mut self.bridge, presence, now)?;
        let card_response = self
            .card
            .poll(&mut self.broker, &mut self.bridge, presence, now)?;

        let typed = match gesture {
            Some(gesture) if !presence => {
                Some(self.bridge.dispatcher_mut().handle_touch(gesture as u8)?)
            }
            _ => None,
        };
        Ok(Tick {
            typed,
            card_response,
        })
    }

    /// Reload persisted state and restart the transports, as after a power cycle
    pub fn reboot(&mut self) -> Result<()> {
        self.bridge.dispatcher_mut().reload()?;
        if let Some(owner) = self.broker.owner() {
            self.broker.release(owner)?;
        }
        self.webusb = WebUsb::new();
        self.card = DirectTransport::new(self.card.owner());
        info!("device rebooted");
        Ok(())
    }
}
