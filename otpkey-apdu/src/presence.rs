//! Non-blocking wait for user presence
//!
//! The engine never sleeps. A command that needs a touch is parked together
//! with a [`PresenceWait`], and the control loop polls it with whatever the
//! touch sensor reported on that tick.

use crate::types::Gesture;

/// Default time a held command waits for a touch, in milliseconds
pub const DEFAULT_PRESENCE_TIMEOUT_MS: u64 = 15_000;

/// Outcome of one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    /// No gesture yet, keep waiting
    Pending,
    /// The user touched the device
    Confirmed,
    /// The window closed without a touch
    Cancelled,
}

/// Deadline tracker for one outstanding presence request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceWait {
    started_at: u64,
    timeout: u64,
}

impl PresenceWait {
    pub fn new(now: u64, timeout: u64) -> Self {
        Self {
            started_at: now,
            timeout,
        }
    }

    /// Millisecond timestamp after which the wait is cancelled
    pub fn deadline(&self) -> u64 {
        self.started_at.saturating_add(self.timeout)
    }

    /// Advance the wait
    ///
    /// Expiry wins over a gesture reported on the same tick.
    pub fn poll(&self, gesture: Option<Gesture>, now: u64) -> PresenceState {
        if now > self.deadline() {
            PresenceState::Cancelled
        } else if gesture.is_some() {
            PresenceState::Confirmed
        } else {
            PresenceState::Pending
        }
    }
}
