//! WebUSB control-transfer transport
//!
//! The host drives every exchange with vendor control requests on the
//! interface: `CMD` carries a command in its data stage, `STAT` reads the
//! one-byte state and `RESP` reads the response once the state says it is
//! ready. The command itself is processed from the control loop, never from
//! the request callback.
//!
//! Between the setup and data stages of `CMD`, and after a response is sent,
//! the buffer stays parked with this transport. A host that stalls mid-command
//! or goes quiet after a response loses it once the broker's hold window
//! passes. A data stage that does not match the announced length aborts the
//! command and frees the buffer.

use crate::broker::{BufferBroker, Owner};
use crate::error::{Error, Result};
use crate::handler::{CommandHandler, Exchange};

use log::{debug, warn};

const OWNER: Owner = Owner::WebUsb;

/// Transport state, reported verbatim by `STAT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WebUsbState {
    Idle = 0xFF,
    SendingResponse = 0x00,
    Process = 0x01,
    SentResponse = 0x02,
    Receiving = 0x03,
    HoldBuffer = 0x04,
}

impl WebUsbState {
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Vendor control requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Request {
    Cmd = 0x00,
    Resp = 0x01,
    Stat = 0x02,
}

impl Request {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(Request::Cmd),
            0x01 => Ok(Request::Resp),
            0x02 => Ok(Request::Stat),
            other => Err(Error::InvalidRequest(other)),
        }
    }
}

/// WebUSB transport state machine
#[derive(Debug)]
pub struct WebUsb {
    state: WebUsbState,
    /// Command length while receiving or processing, response length after
    len: usize,
    waiting: bool,
}

impl WebUsb {
    pub fn new() -> Self {
        Self {
            state: WebUsbState::Idle,
            len: 0,
            waiting: false,
        }
    }

    pub fn state(&self) -> WebUsbState {
        self.state
    }

    /// True while the current command waits for user presence
    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    /// Setup stage of `CMD`: take the buffer for a `w_length`-byte command
    ///
    /// A new setup while still receiving replaces the unfinished command.
    pub fn begin_command<const N: usize>(
        &mut self,
        broker: &mut BufferBroker<N>,
        w_length: usize,
        now: u64,
    ) -> Result<()> {
        broker.touch(OWNER, now);
        if !matches!(
            self.state,
            WebUsbState::Idle | WebUsbState::HoldBuffer | WebUsbState::Receiving
        ) {
            warn!("CMD in state {:?}", self.state);
            return Err(Error::InvalidState);
        }
        if w_length > N {
            return Err(Error::MessageTooLarge);
        }
        broker.acquire(OWNER)?;
        broker.park(OWNER, now)?;
        self.len = w_length;
        self.state = WebUsbState::Receiving;
        Ok(())
    }

    /// Data stage of `CMD`: the command bytes arrived
    pub fn receive<const N: usize>(
        &mut self,
        broker: &mut BufferBroker<N>,
        data: &[u8],
    ) -> Result<()> {
        if self.state != WebUsbState::Receiving {
            return Err(Error::InvalidState);
        }
        if data.len() != self.len {
            warn!("CMD data stage of {} bytes, expected {}", data.len(), self.len);
            self.abort(broker)?;
            return Err(Error::InvalidState);
        }
        if let Err(err) = broker.acquire(OWNER) {
            self.state = WebUsbState::Idle;
            return Err(err);
        }
        broker.buffer_mut(OWNER)?[..data.len()].copy_from_slice(data);
        self.state = WebUsbState::Process;
        Ok(())
    }

    /// Drop the command being received and free the buffer
    fn abort<const N: usize>(&mut self, broker: &mut BufferBroker<N>) -> Result<()> {
        self.state = WebUsbState::Idle;
        self.len = 0;
        if broker.is_owned_by(OWNER) {
            broker.release(OWNER)?;
        }
        Ok(())
    }

    /// Both stages of `CMD` in one call
    pub fn command<const N: usize>(
        &mut self,
        broker: &mut BufferBroker<N>,
        data: &[u8],
        now: u64,
    ) -> Result<()> {
        self.begin_command(broker, data.len(), now)?;
        self.receive(broker, data)
    }

    /// Handle one vendor control request by its `bRequest` code
    ///
    /// `data` is the OUT data stage of `CMD`. The result is the IN data
    /// stage: the state byte for `STAT`, the response for `RESP`, nothing for
    /// `CMD`.
    pub fn control<const N: usize>(
        &mut self,
        broker: &mut BufferBroker<N>,
        b_request: u8,
        w_length: usize,
        data: &[u8],
        now: u64,
    ) -> Result<Vec<u8>> {
        match Request::from_u8(b_request)? {
            Request::Cmd => {
                self.begin_command(broker, w_length, now)?;
                self.receive(broker, data)?;
                Ok(Vec::new())
            }
            Request::Stat => Ok(vec![self.status(broker, now)]),
            Request::Resp => {
                let response = self.response(broker, w_length, now)?;
                self.response_sent(broker, now)?;
                Ok(response)
            }
        }
    }

    /// `STAT`: current state byte
    pub fn status<const N: usize>(&mut self, broker: &mut BufferBroker<N>, now: u64) -> u8 {
        broker.touch(OWNER, now);
        self.state.to_u8()
    }

    /// `RESP`: up to `w_length` bytes of the ready response
    pub fn response<const N: usize>(
        &mut self,
        broker: &mut BufferBroker<N>,
        w_length: usize,
        now: u64,
    ) -> Result<Vec<u8>> {
        broker.touch(OWNER, now);
        if self.state != WebUsbState::SendingResponse {
            return Err(Error::InvalidState);
        }
        let len = self.len.min(w_length);
        let out = broker.buffer_mut(OWNER)?[..len].to_vec();
        self.state = WebUsbState::SentResponse;
        Ok(out)
    }

    /// The `RESP` data stage went out: park the buffer
    pub fn response_sent<const N: usize>(
        &mut self,
        broker: &mut BufferBroker<N>,
        now: u64,
    ) -> Result<()> {
        if self.state != WebUsbState::SentResponse {
            return Ok(());
        }
        broker.park(OWNER, now)?;
        self.state = WebUsbState::HoldBuffer;
        Ok(())
    }

    /// One control-loop step
    ///
    /// Drops a parked buffer the broker reclaimed, whether it was waiting
    /// for a data stage or holding a sent response, and runs or resumes the
    /// received command.
    pub fn poll<const N: usize, H: CommandHandler>(
        &mut self,
        broker: &mut BufferBroker<N>,
        handler: &mut H,
        presence: bool,
        now: u64,
    ) -> Result<()> {
        if matches!(self.state, WebUsbState::HoldBuffer | WebUsbState::Receiving) {
            if broker.reclaim_if_stale(now) == Some(OWNER) || !broker.is_owned_by(OWNER) {
                debug!("WebUSB buffer released after time-out in {:?}", self.state);
                self.state = WebUsbState::Idle;
            }
            return Ok(());
        }
        if self.state != WebUsbState::Process {
            return Ok(());
        }

        let buffer = broker.buffer_mut(OWNER)?;
        let exchange = if self.waiting {
            match handler.poll(buffer, presence, now) {
                Some(exchange) => exchange,
                None => Exchange::Complete(0),
            }
        } else {
            handler.handle_command(buffer, self.len, now)
        };

        match exchange {
            Exchange::Pending => self.waiting = true,
            Exchange::Complete(len) => {
                self.waiting = false;
                self.len = len;
                self.state = WebUsbState::SendingResponse;
            }
        }
        Ok(())
    }
}

impl Default for WebUsb {
    fn default() -> Self {
        Self::new()
    }
}
