//! Direct exchange transport
//!
//! NFC, wired contact and the virtual card all hand over a complete command
//! and expect the complete response back. Each exchange acquires the buffer,
//! runs the command and releases the buffer again. A command waiting for
//! presence keeps its lease until `poll` finishes it.

use crate::broker::{BufferBroker, Owner};
use crate::error::{Error, Result};
use crate::handler::{CommandHandler, Exchange};

use log::debug;

/// One-shot command exchange for a single owner
#[derive(Debug)]
pub struct DirectTransport {
    owner: Owner,
    waiting: bool,
}

impl DirectTransport {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            waiting: false,
        }
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    /// True while an exchange waits for user presence
    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    /// Run one command
    ///
    /// Returns `None` when the command waits for presence; its response then
    /// comes from a later `poll`. A busy buffer fails with `Error::Busy` and
    /// the command is not processed.
    pub fn exchange<const N: usize, H: CommandHandler>(
        &mut self,
        broker: &mut BufferBroker<N>,
        handler: &mut H,
        command: &[u8],
        now: u64,
    ) -> Result<Option<Vec<u8>>> {
        if self.waiting {
            return Err(Error::Busy(self.owner));
        }
        if command.len() > N {
            return Err(Error::MessageTooLarge);
        }
        broker.acquire(self.owner)?;

        let buffer = broker.buffer_mut(self.owner)?;
        buffer[..command.len()].copy_from_slice(command);
        let exchange = handler.handle_command(buffer, command.len(), now);
        self.finish(broker, exchange)
    }

    /// Drive a waiting exchange, `None` while it is still waiting
    pub fn poll<const N: usize, H: CommandHandler>(
        &mut self,
        broker: &mut BufferBroker<N>,
        handler: &mut H,
        presence: bool,
        now: u64,
    ) -> Result<Option<Vec<u8>>> {
        if !self.waiting {
            return Ok(None);
        }
        let buffer = broker.buffer_mut(self.owner)?;
        let exchange = handler
            .poll(buffer, presence, now)
            .unwrap_or(Exchange::Complete(0));
        self.finish(broker, exchange)
    }

    fn finish<const N: usize>(
        &mut self,
        broker: &mut BufferBroker<N>,
        exchange: Exchange,
    ) -> Result<Option<Vec<u8>>> {
        match exchange {
            Exchange::Pending => {
                debug!("{:?} exchange waiting for presence", self.owner);
                self.waiting = true;
                Ok(None)
            }
            Exchange::Complete(len) => {
                self.waiting = false;
                let response = broker.buffer_mut(self.owner)?[..len].to_vec();
                broker.release(self.owner)?;
                Ok(Some(response))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::tests::MockHandler;

    #[test]
    fn test_exchange_releases() {
        let mut broker = BufferBroker::<16>::new();
        let mut handler = MockHandler::default();
        let mut nfc = DirectTransport::new(Owner::Nfc);

        let resp = nfc
            .exchange(&mut broker, &mut handler, &[1, 2, 3], 0)
            .unwrap();
        assert_eq!(resp, Some(vec![1, 2, 3]));
        assert_eq!(broker.owner(), None);
    }

    #[test]
    fn test_busy_buffer_not_processed() {
        let mut broker = BufferBroker::<16>::new();
        let mut handler = MockHandler::default();
        broker.acquire(Owner::WebUsb).unwrap();

        let mut nfc = DirectTransport::new(Owner::Nfc);
        assert_eq!(
            nfc.exchange(&mut broker, &mut handler, &[1], 0),
            Err(Error::Busy(Owner::WebUsb))
        );
        assert_eq!(handler.handled, 0);
    }

    #[test]
    fn test_oversized_command() {
        let mut broker = BufferBroker::<4>::new();
        let mut handler = MockHandler::default();
        let mut card = DirectTransport::new(Owner::Virtual);
        assert_eq!(
            card.exchange(&mut broker, &mut handler, &[0; 5], 0),
            Err(Error::MessageTooLarge)
        );
        assert_eq!(broker.owner(), None);
    }

    #[test]
    fn test_presence_keeps_lease() {
        let mut broker = BufferBroker::<16>::new();
        let mut handler = MockHandler::default();
        let mut card = DirectTransport::new(Owner::Virtual);

        assert_eq!(
            card.exchange(&mut broker, &mut handler, &[0xEE, 7], 0),
            Ok(None)
        );
        assert!(broker.is_owned_by(Owner::Virtual));
        assert_eq!(
            card.exchange(&mut broker, &mut handler, &[1], 0),
            Err(Error::Busy(Owner::Virtual))
        );

        assert_eq!(card.poll(&mut broker, &mut handler, false, 5), Ok(None));
        assert_eq!(
            card.poll(&mut broker, &mut handler, true, 6),
            Ok(Some(vec![0xEE, 7]))
        );
        assert_eq!(broker.owner(), None);
    }
}
