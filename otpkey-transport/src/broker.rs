//! Command Buffer Broker
//!
//! Owns the one command buffer shared by every transport and decides which
//! transport may touch it. A transport acquires the buffer, exchanges one
//! command through it and then either releases it or parks it to keep it
//! across follow-up polling. A parked buffer with no progress for longer than
//! the hold window is reclaimed.

use crate::error::{Error, Result};

use log::{debug, warn};

/// Size of the shared command buffer in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 1280;

/// Inactivity window after which a parked buffer is reclaimed
pub const DEFAULT_HOLD_WINDOW_MS: u64 = 2000;

/// Transport that may own the command buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    WebUsb,
    Ccid,
    Nfc,
    Virtual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lease {
    Free,
    Busy(Owner),
    Parked { owner: Owner, since: u64 },
}

/// Exclusive arbiter of the shared command buffer
pub struct BufferBroker<const N: usize = DEFAULT_BUFFER_SIZE> {
    buffer: [u8; N],
    lease: Lease,
    hold_window: u64,
}

impl<const N: usize> BufferBroker<N> {
    /// Create a broker with a free, zeroed buffer
    pub fn new() -> Self {
        Self {
            buffer: [0u8; N],
            lease: Lease::Free,
            hold_window: DEFAULT_HOLD_WINDOW_MS,
        }
    }

    /// Set the parked-buffer inactivity window
    pub fn with_hold_window(mut self, window_ms: u64) -> Self {
        self.hold_window = window_ms;
        self
    }

    /// Buffer capacity in bytes
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Current owner, parked or not
    pub fn owner(&self) -> Option<Owner> {
        match self.lease {
            Lease::Free => None,
            Lease::Busy(owner) | Lease::Parked { owner, .. } => Some(owner),
        }
    }

    pub fn is_owned_by(&self, owner: Owner) -> bool {
        self.owner() == Some(owner)
    }

    pub fn is_parked(&self) -> bool {
        matches!(self.lease, Lease::Parked { .. })
    }

    /// Take the buffer for `owner`
    ///
    /// Succeeds on a free buffer, or on one parked by the same owner. A buffer
    /// in active use is never handed out again, not even to its holder.
    pub fn acquire(&mut self, owner: Owner) -> Result<()> {
        match self.lease {
            Lease::Free => {
                debug!("buffer acquired by {:?}", owner);
                self.lease = Lease::Busy(owner);
                Ok(())
            }
            Lease::Parked { owner: holder, .. } if holder == owner => {
                self.lease = Lease::Busy(owner);
                Ok(())
            }
            Lease::Busy(holder) | Lease::Parked { owner: holder, .. } => Err(Error::Busy(holder)),
        }
    }

    /// Give the buffer back
    ///
    /// Only the ownership marker is cleared; the bytes stay as they are.
    pub fn release(&mut self, owner: Owner) -> Result<()> {
        if !self.is_owned_by(owner) {
            return Err(Error::NotOwner);
        }
        debug!("buffer released by {:?}", owner);
        self.lease = Lease::Free;
        Ok(())
    }

    /// Keep the buffer between exchanges
    pub fn park(&mut self, owner: Owner, now: u64) -> Result<()> {
        if !self.is_owned_by(owner) {
            return Err(Error::NotOwner);
        }
        self.lease = Lease::Parked { owner, since: now };
        Ok(())
    }

    /// Record progress on a parked buffer, restarting its hold window
    pub fn touch(&mut self, owner: Owner, now: u64) {
        if let Lease::Parked { owner: holder, since } = &mut self.lease {
            if *holder == owner {
                *since = now;
            }
        }
    }

    /// Force-release a parked buffer whose owner went quiet
    ///
    /// Returns the owner that lost the buffer.
    pub fn reclaim_if_stale(&mut self, now: u64) -> Option<Owner> {
        let Lease::Parked { owner, since } = self.lease else {
            return None;
        };
        if now.saturating_sub(since) <= self.hold_window {
            return None;
        }
        warn!("reclaiming command buffer parked by {:?}", owner);
        self.lease = Lease::Free;
        Some(owner)
    }

    /// Borrow the buffer bytes
    ///
    /// Only the current owner gets them, and `&mut self` rules out a second
    /// borrow while this one lives.
    pub fn buffer_mut(&mut self, owner: Owner) -> Result<&mut [u8]> {
        if !self.is_owned_by(owner) {
            return Err(Error::NotOwner);
        }
        Ok(&mut self.buffer[..])
    }
}

impl<const N: usize> Default for BufferBroker<N> {
    fn default() -> Self {
        Self::new()
    }
}
