//! OATH credential application
//!
//! Holds the application state shared by the OATH command handlers in
//! [`crate::commands`]: configuration, the credential store, the wall clock,
//! the pending continuation of a paginated listing, and the one-shot presence
//! grant used to complete touch-gated calculations.

pub mod otp;

use crate::apdu::Response;
use crate::status::{self, Result, StatusCode};
use crate::store::{Clock, CredentialStore};
use crate::types::{CredentialRecord, OtpKind};

use alloc::vec::Vec;

use log::{debug, error};
use otpkey_crypto::{MacOutput, hmac};

pub use otp::OtpCode;

/// TLV tags
pub mod tags {
    pub const NAME: u8 = 0x71;
    pub const NAME_LIST: u8 = 0x72;
    pub const KEY: u8 = 0x73;
    pub const CHALLENGE: u8 = 0x74;
    pub const FULL_RESPONSE: u8 = 0x75;
    pub const RESPONSE: u8 = 0x76;
    pub const NO_RESPONSE: u8 = 0x77;
    pub const PROPERTY: u8 = 0x78;
    pub const VERSION: u8 = 0x79;
    pub const COUNTER: u8 = 0x7A;
    pub const TOUCH_REQUIRED: u8 = 0x7C;
}

/// Application version reported by SELECT
pub const VERSION: [u8; 3] = [0x05, 0x05, 0x05];

/// Longest accepted challenge
pub const MAX_CHALLENGE_LEN: usize = 8;

/// OATH application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OathConfig {
    /// Upper bound on live records, on top of the store's own capacity
    pub max_records: usize,

    /// TOTP time step in seconds, never zero
    totp_period: u64,

    /// How long a touch-gated CALCULATE waits, in milliseconds
    pub presence_timeout_ms: u64,

    /// Reported in the SELECT response so clients can tell devices apart
    pub device_id: [u8; 8],
}

impl OathConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self {
            max_records: 100,
            totp_period: 30,
            presence_timeout_ms: crate::presence::DEFAULT_PRESENCE_TIMEOUT_MS,
            device_id: [0u8; 8],
        }
    }

    /// Set the record limit
    pub fn with_max_records(mut self, max: usize) -> Self {
        self.max_records = max;
        self
    }

    /// Set the TOTP time step; zero is raised to one second
    pub fn with_totp_period(mut self, seconds: u64) -> Self {
        self.totp_period = seconds.max(1);
        self
    }

    pub fn totp_period(&self) -> u64 {
        self.totp_period
    }

    /// Set the presence timeout
    pub fn with_presence_timeout_ms(mut self, timeout: u64) -> Self {
        self.presence_timeout_ms = timeout;
        self
    }

    /// Set the device identifier
    pub fn with_device_id(mut self, device_id: [u8; 8]) -> Self {
        self.device_id = device_id;
        self
    }
}

impl Default for OathConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Unsent tail of a paginated response
struct Continuation {
    data: Vec<u8>,
    offset: usize,
}

/// OATH application state
pub struct Oath<S: CredentialStore, K: Clock> {
    config: OathConfig,
    store: S,
    clock: K,
    continuation: Option<Continuation>,
    presence: bool,
}

impl<S: CredentialStore, K: Clock> Oath<S, K> {
    pub fn new(config: OathConfig, store: S, clock: K) -> Self {
        Self {
            config,
            store,
            clock,
            continuation: None,
            presence: false,
        }
    }

    pub fn config(&self) -> &OathConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Records that may be live at once
    pub fn record_limit(&self) -> usize {
        self.config.max_records.min(self.store.capacity())
    }

    /// Allow the next touch-gated calculation to run
    pub(crate) fn grant_presence(&mut self) {
        self.presence = true;
    }

    pub(crate) fn revoke_presence(&mut self) {
        self.presence = false;
    }

    pub(crate) fn has_presence(&self) -> bool {
        self.presence
    }

    /// Write a record, logging failures
    pub(crate) fn persist(&self, record: &CredentialRecord) -> Result<()> {
        self.store.put(record).map_err(|err| {
            error!("failed to persist credential record: {}", err);
            err
        })
    }

    pub fn has_continuation(&self) -> bool {
        self.continuation.is_some()
    }

    /// Forget any unsent listing
    pub fn discard_continuation(&mut self) {
        if self.continuation.take().is_some() {
            debug!("pending continuation discarded");
        }
    }

    /// Send `data` as a paginated response
    pub(crate) fn begin_continuation(&mut self, data: Vec<u8>, resp: &mut Response) -> Result<()> {
        self.continuation = Some(Continuation { data, offset: 0 });
        self.send_remaining(resp)
    }

    /// Send the next chunk of the pending listing
    ///
    /// Leaves `0x61XX` in the response while bytes remain and clears the
    /// continuation once the last chunk is out.
    pub(crate) fn send_remaining(&mut self, resp: &mut Response) -> Result<()> {
        let cont = self
            .continuation
            .as_mut()
            .ok_or(StatusCode::ConditionsNotSatisfied)?;

        let pending = &cont.data[cont.offset..];
        let chunk = pending.len().min(resp.remaining());
        resp.extend_from_slice(&pending[..chunk])?;
        cont.offset += chunk;

        let left = cont.data.len() - cont.offset;
        if left > 0 {
            resp.set_status(status::bytes_remaining(left));
        } else {
            self.continuation = None;
        }
        Ok(())
    }

    /// Compute the code a touch slot emits for `name`
    ///
    /// HOTP uses the stored counter plus one, TOTP the current time step. The
    /// advanced counter or baseline is persisted before the code is returned.
    /// An absent credential yields `None`.
    pub fn next_code(&mut self, name: &[u8]) -> Result<Option<OtpCode>> {
        let Some(mut record) = self.store.get(name)? else {
            return Ok(None);
        };

        let (challenge, changed) = match record.algorithm.kind {
            OtpKind::Hotp => {
                let next = record
                    .counter
                    .checked_add(1)
                    .ok_or(StatusCode::ConditionsNotSatisfied)?;
                record.counter = next;
                (next.to_be_bytes(), true)
            }
            OtpKind::Totp => {
                let step = self.clock.unix_time() / self.config.totp_period();
                let challenge = step.to_be_bytes();
                let changed = admit_challenge(&mut record, &challenge)?;
                (challenge, changed)
            }
        };

        let mac = compute_mac(&record, &challenge)?;
        if changed {
            self.persist(&record)?;
        }
        Ok(Some(OtpCode::new(otp::truncate(&mac), record.digits)))
    }
}

/// Big-endian value of a challenge of up to eight bytes
pub(crate) fn challenge_value(challenge: &[u8]) -> u64 {
    challenge
        .iter()
        .fold(0u64, |acc, &byte| (acc << 8) | byte as u64)
}

/// Apply the increasing-only policy to an in-memory record
///
/// Returns `true` when the record's baseline advanced and must be persisted.
pub(crate) fn admit_challenge(record: &mut CredentialRecord, challenge: &[u8]) -> Result<bool> {
    if !record.properties.increasing_only() {
        return Ok(false);
    }
    let value = challenge_value(challenge);
    if value <= record.counter {
        return Err(StatusCode::SecurityStatusNotSatisfied);
    }
    record.counter = value;
    Ok(true)
}

pub(crate) fn compute_mac(record: &CredentialRecord, challenge: &[u8]) -> Result<MacOutput> {
    Ok(hmac(
        record.algorithm.hash,
        record.secret.as_slice(),
        challenge,
    )?)
}
