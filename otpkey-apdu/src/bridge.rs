//! APDU router as a transport command handler
//!
//! Transports hand over the shared buffer with a command in its first `len`
//! bytes and get it back holding the response. A command held for presence
//! surfaces as `Exchange::Pending` and is finished by later polls, where the
//! transport only says whether the user touched the key.
//!
//! Requires the `transport` feature.

use crate::dispatcher::{CommandDispatcher, Dispatch};
use crate::store::{Clock, CredentialStore};
use crate::types::Gesture;

use otpkey_transport::{CommandHandler, Exchange};

/// [`CommandDispatcher`] wrapped for use as a `CommandHandler`
pub struct TransportBridge<S: CredentialStore, K: Clock> {
    dispatcher: CommandDispatcher<S, K>,
}

impl<S: CredentialStore, K: Clock> TransportBridge<S, K> {
    pub fn new(dispatcher: CommandDispatcher<S, K>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<S, K> {
        &self.dispatcher
    }

    /// Router access for touch output and reloads
    pub fn dispatcher_mut(&mut self) -> &mut CommandDispatcher<S, K> {
        &mut self.dispatcher
    }
}

fn exchange(dispatch: Dispatch) -> Exchange {
    match dispatch {
        Dispatch::Complete(len) => Exchange::Complete(len),
        Dispatch::Pending => Exchange::Pending,
    }
}

impl<S: CredentialStore, K: Clock> CommandHandler for TransportBridge<S, K> {
    fn handle_command(&mut self, buffer: &mut [u8], len: usize, now: u64) -> Exchange {
        exchange(self.dispatcher.dispatch(buffer, len, now))
    }

    fn poll(&mut self, buffer: &mut [u8], presence: bool, now: u64) -> Option<Exchange> {
        // The transport does not report which gesture; any one confirms
        let gesture = presence.then_some(Gesture::Short);
        self.dispatcher.poll(buffer, gesture, now).map(exchange)
    }
}
