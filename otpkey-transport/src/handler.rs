//! Command handler seam
//!
//! Transports move bytes; a [`CommandHandler`] turns the command sitting in
//! the shared buffer into a response in the same buffer.

/// Outcome of handing a command to the handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    /// The buffer now holds this many response bytes
    Complete(usize),
    /// The command waits for user presence, keep the buffer and poll
    Pending,
}

/// Trait for processing commands in place
///
/// Implement this trait to process commands and generate responses.
pub trait CommandHandler {
    /// Process the command in `buffer[..len]`
    ///
    /// On `Complete(n)` the response occupies `buffer[..n]`.
    fn handle_command(&mut self, buffer: &mut [u8], len: usize, now: u64) -> Exchange;

    /// Drive a command that returned `Pending`
    ///
    /// `presence` reports a gesture seen since the last poll. Returns `None`
    /// when nothing is outstanding.
    fn poll(&mut self, buffer: &mut [u8], presence: bool, now: u64) -> Option<Exchange>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Echoes the command back; commands starting with 0xEE wait for presence
    #[derive(Default)]
    pub(crate) struct MockHandler {
        held: Option<usize>,
        pub(crate) handled: usize,
    }

    impl CommandHandler for MockHandler {
        fn handle_command(&mut self, buffer: &mut [u8], len: usize, _now: u64) -> Exchange {
            self.handled += 1;
            if buffer.first() == Some(&0xEE) {
                self.held = Some(len);
                return Exchange::Pending;
            }
            Exchange::Complete(len)
        }

        fn poll(&mut self, _buffer: &mut [u8], presence: bool, _now: u64) -> Option<Exchange> {
            let len = self.held?;
            if !presence {
                return Some(Exchange::Pending);
            }
            self.held = None;
            Some(Exchange::Complete(len))
        }
    }

    #[test]
    fn test_mock_echo() {
        let mut handler = MockHandler::default();
        let mut buf = [1u8, 2, 3, 0];
        assert_eq!(handler.handle_command(&mut buf, 3, 0), Exchange::Complete(3));
        assert_eq!(handler.poll(&mut buf, true, 0), None);
    }

    #[test]
    fn test_mock_presence() {
        let mut handler = MockHandler::default();
        let mut buf = [0xEEu8, 2];
        assert_eq!(handler.handle_command(&mut buf, 2, 0), Exchange::Pending);
        assert_eq!(handler.poll(&mut buf, false, 1), Some(Exchange::Pending));
        assert_eq!(handler.poll(&mut buf, true, 2), Some(Exchange::Complete(2)));
    }
}
