//! Command router
//!
//! Parses a command in place, routes it to the OATH or touch-output handlers
//! and writes the response followed by its status word back into the same
//! buffer. The buffer is split behind the command bytes so the parsed command
//! and the response under construction never alias.

use crate::apdu::{Command, Response};
use crate::commands::{self, Instruction};
use crate::oath::{Oath, OathConfig};
use crate::pass::{Pass, TouchOutput};
use crate::presence::{PresenceState, PresenceWait};
use crate::status::{Result, StatusCode};
use crate::store::{Clock, CredentialStore};
use crate::types::Gesture;

use log::{debug, info, warn};

/// Result of handing a command to the router
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The buffer holds this many response bytes, status word included
    Complete(usize),
    /// The command waits for a touch; keep the buffer and call `poll`
    Pending,
}

/// A command held until the user confirms presence
#[derive(Debug, Clone, Copy)]
struct Held {
    len: usize,
    wait: PresenceWait,
}

enum Outcome {
    Body(usize, u16),
    Status(StatusCode),
    Deferred,
}

/// Command router
///
/// Owns both applications. The OATH state holds the credential store; the
/// touch-output state holds the slot table loaded from it.
pub struct CommandDispatcher<S: CredentialStore, K: Clock> {
    oath: Oath<S, K>,
    pass: Pass,
    held: Option<Held>,
}

impl<S: CredentialStore, K: Clock> CommandDispatcher<S, K> {
    /// Create a dispatcher, loading touch bindings from the store
    pub fn new(config: OathConfig, store: S, clock: K) -> Result<Self> {
        let pass = Pass::load(&store)?;
        info!(
            "command dispatcher ready ({} of {} records used)",
            store.count()?,
            config.max_records.min(store.capacity())
        );
        Ok(Self {
            oath: Oath::new(config, store, clock),
            pass,
            held: None,
        })
    }

    pub fn oath(&self) -> &Oath<S, K> {
        &self.oath
    }

    pub fn pass(&self) -> &Pass {
        &self.pass
    }

    /// Re-read persisted state as after a power cycle
    pub fn reload(&mut self) -> Result<()> {
        self.pass = Pass::load(self.oath.store())?;
        self.oath.discard_continuation();
        self.held = None;
        info!("applications reloaded from store");
        Ok(())
    }

    /// True while a held command waits for a touch
    pub fn is_waiting(&self) -> bool {
        self.held.is_some()
    }

    /// Process the command in `buffer[..len]`
    ///
    /// On `Complete(n)` the response occupies `buffer[..n]`. On `Pending` the
    /// buffer must be left untouched until `poll` completes the command.
    pub fn dispatch(&mut self, buffer: &mut [u8], len: usize, now: u64) -> Dispatch {
        if self.held.take().is_some() {
            warn!("new command while a presence wait was outstanding, held command dropped");
        }
        match self.execute(buffer, len) {
            Some(total) => Dispatch::Complete(total),
            None => {
                let timeout = self.oath.config().presence_timeout_ms;
                debug!("command held for user presence ({} ms)", timeout);
                self.held = Some(Held {
                    len,
                    wait: PresenceWait::new(now, timeout),
                });
                Dispatch::Pending
            }
        }
    }

    /// Drive an outstanding presence wait
    ///
    /// Returns `None` when nothing is held. A gesture confirms presence and
    /// re-runs the held command; an expired wait fails it with `0x6982`.
    pub fn poll(
        &mut self,
        buffer: &mut [u8],
        gesture: Option<Gesture>,
        now: u64,
    ) -> Option<Dispatch> {
        let held = self.held?;
        match held.wait.poll(gesture, now) {
            PresenceState::Pending => Some(Dispatch::Pending),
            PresenceState::Confirmed => {
                self.held = None;
                self.oath.grant_presence();
                let total = self.execute(buffer, held.len);
                self.oath.revoke_presence();
                match total {
                    Some(total) => Some(Dispatch::Complete(total)),
                    None => {
                        self.held = Some(held);
                        Some(Dispatch::Pending)
                    }
                }
            }
            PresenceState::Cancelled => {
                self.held = None;
                warn!("presence wait timed out");
                Some(Dispatch::Complete(write_status(
                    buffer,
                    StatusCode::SecurityStatusNotSatisfied.to_u16(),
                )))
            }
        }
    }

    /// Touch-output path for a raw gesture code
    pub fn handle_touch(&mut self, code: u8) -> Result<TouchOutput> {
        self.pass.handle_touch(&mut self.oath, code)
    }

    /// Run one command, `None` when it was deferred for presence
    fn execute(&mut self, buffer: &mut [u8], len: usize) -> Option<usize> {
        if buffer.len() < 2 {
            return Some(0);
        }
        let len = len.min(buffer.len());

        let outcome = {
            let (front, back) = buffer.split_at_mut(len);
            match Command::parse(front) {
                Err(status) => Outcome::Status(status),
                Ok(cmd) => {
                    let cap = cmd.le().min(back.len());
                    let mut resp = Response::new(&mut back[..cap]);
                    let result = self.route(&cmd, &mut resp);
                    if resp.is_deferred() {
                        Outcome::Deferred
                    } else {
                        match result {
                            Ok(()) => Outcome::Body(resp.len(), resp.status()),
                            Err(status) => Outcome::Status(status),
                        }
                    }
                }
            }
        };

        match outcome {
            Outcome::Deferred => None,
            Outcome::Status(status) => {
                debug!("command failed: {}", status);
                Some(write_status(buffer, status.to_u16()))
            }
            Outcome::Body(body_len, sw) => {
                buffer.copy_within(len..len + body_len, 0);
                buffer[body_len..body_len + 2].copy_from_slice(&sw.to_be_bytes());
                Some(body_len + 2)
            }
        }
    }

    fn route(&mut self, cmd: &Command, resp: &mut Response) -> Result<()> {
        let Some(instruction) = Instruction::from_apdu(cmd.ins, cmd.p1) else {
            self.oath.discard_continuation();
            return Err(StatusCode::InsNotSupported);
        };
        debug!(
            "{:?} p1={:#04x} p2={:#04x} lc={} le={}",
            instruction,
            cmd.p1,
            cmd.p2,
            cmd.lc(),
            cmd.le()
        );
        if instruction != Instruction::SendRemaining {
            self.oath.discard_continuation();
        }

        let oath = &mut self.oath;
        let pass = &mut self.pass;
        match instruction {
            Instruction::Put => commands::put::handle(oath, cmd, resp),
            Instruction::Delete => commands::delete::handle(oath, cmd, resp),
            Instruction::Reset => commands::reset::handle(oath, pass, cmd, resp),
            Instruction::SetDefault => commands::touch_config::set_default(oath, pass, cmd, resp),
            Instruction::List => commands::list::list(oath, cmd, resp),
            Instruction::Select => commands::list::select(oath, cmd, resp),
            Instruction::SendRemaining => commands::list::send_remaining(oath, cmd, resp),
            Instruction::Calculate => commands::calculate::calculate(oath, cmd, resp),
            Instruction::CalculateAll => commands::calculate::calculate_all(oath, cmd, resp),
            Instruction::ReadConfig => commands::touch_config::read_config(oath, pass, cmd, resp),
            Instruction::WriteConfig => {
                commands::touch_config::write_config(oath, pass, cmd, resp)
            }
        }
    }
}

/// Write a bare status word at the start of the buffer
fn write_status(buffer: &mut [u8], sw: u16) -> usize {
    if buffer.len() < 2 {
        return 0;
    }
    buffer[..2].copy_from_slice(&sw.to_be_bytes());
    2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FixedClock, MemoryStore};
    use crate::types::Properties;
    use hex_literal::hex;

    type TestDispatcher = CommandDispatcher<MemoryStore, FixedClock>;

    fn dispatcher() -> TestDispatcher {
        CommandDispatcher::new(OathConfig::new(), MemoryStore::new(8), FixedClock(0)).unwrap()
    }

    /// Copy `apdu` into a 512-byte buffer and dispatch it
    fn exchange(d: &mut TestDispatcher, apdu: &[u8]) -> Vec<u8> {
        let mut buf = [0u8; 512];
        buf[..apdu.len()].copy_from_slice(apdu);
        match d.dispatch(&mut buf, apdu.len(), 0) {
            Dispatch::Complete(n) => buf[..n].to_vec(),
            Dispatch::Pending => panic!("unexpected presence wait"),
        }
    }

    fn put_abc(d: &mut TestDispatcher, props: u8) {
        let mut apdu = vec![0x00, 0x01, 0x00, 0x00, 0x0E];
        apdu.extend_from_slice(&[
            0x71, 0x03, b'a', b'b', b'c', 0x73, 0x05, 0x21, 0x06, 0x00, 0x01, 0x02, 0x78, props,
        ]);
        assert_eq!(exchange(d, &apdu), vec![0x90, 0x00]);
    }

    const CALC_ABC: [u8; 17] = [
        0x00, 0xA2, 0x00, 0x01, 0x0C, 0x71, 0x03, b'a', b'b', b'c', 0x74, 0x05, 0x21, 0x06,
        0x00, 0x01, 0x02,
    ];

    #[test]
    fn test_unknown_instruction() {
        let mut d = dispatcher();
        assert_eq!(exchange(&mut d, &[0x00, 0xEE, 0x00, 0x00]), vec![0x6D, 0x00]);
    }

    #[test]
    fn test_inconsistent_length_no_mutation() {
        let mut d = dispatcher();
        // Lc claims 0x10 bytes, the PUT body carries 0x0E
        let mut apdu = vec![0x00, 0x01, 0x00, 0x00, 0x10];
        apdu.extend_from_slice(&[
            0x71, 0x03, b'a', b'b', b'c', 0x73, 0x05, 0x21, 0x06, 0x00, 0x01, 0x02, 0x78, 0x00,
        ]);
        assert_eq!(exchange(&mut d, &apdu), vec![0x67, 0x00]);
        assert_eq!(d.oath().store().count().unwrap(), 0);
    }

    #[test]
    fn test_response_moved_to_front() {
        let mut d = dispatcher();
        put_abc(&mut d, 0);
        assert_eq!(exchange(&mut d, &CALC_ABC), hex!("7605067ff136be9000").to_vec());
    }

    #[test]
    fn test_other_command_discards_continuation() {
        let mut d = dispatcher();
        for i in 0..6u8 {
            let apdu = [
                0x00, 0x01, 0x00, 0x00, 0x0C, 0x71, 0x03, b'x', b'y', b'0' + i, 0x73, 0x05, 0x21,
                0x06, 0x00, 0x01, 0x02,
            ];
            assert_eq!(exchange(&mut d, &apdu), vec![0x90, 0x00]);
        }
        // 6 entries of 6 bytes, Le = 16
        let first = exchange(&mut d, &[0x00, 0xA1, 0x00, 0x00, 0x10]);
        assert_eq!(first.len(), 18);
        assert_eq!(&first[16..], &[0x61, 20]);

        exchange(&mut d, &CALC_ABC);
        assert_eq!(exchange(&mut d, &[0x00, 0xA5, 0x00, 0x00]), vec![0x69, 0x85]);
    }

    #[test]
    fn test_le_caps_plain_response() {
        let mut d = dispatcher();
        put_abc(&mut d, 0);
        let mut apdu = CALC_ABC.to_vec();
        apdu.push(0x04);
        assert_eq!(exchange(&mut d, &apdu), vec![0x67, 0x00]);
    }

    #[test]
    fn test_presence_confirmed() {
        let mut d = dispatcher();
        put_abc(&mut d, Properties::REQUIRES_TOUCH);

        let mut buf = [0u8; 512];
        buf[..CALC_ABC.len()].copy_from_slice(&CALC_ABC);
        assert_eq!(d.dispatch(&mut buf, CALC_ABC.len(), 1_000), Dispatch::Pending);
        assert!(d.is_waiting());

        assert_eq!(d.poll(&mut buf, None, 2_000), Some(Dispatch::Pending));
        let done = d.poll(&mut buf, Some(Gesture::Short), 3_000);
        assert_eq!(done, Some(Dispatch::Complete(9)));
        assert_eq!(&buf[..9], &hex!("7605067ff136be9000"));
        assert!(!d.is_waiting());
        assert_eq!(d.poll(&mut buf, None, 3_000), None);

        // Presence is single use
        buf[..CALC_ABC.len()].copy_from_slice(&CALC_ABC);
        assert_eq!(d.dispatch(&mut buf, CALC_ABC.len(), 4_000), Dispatch::Pending);
    }

    #[test]
    fn test_presence_timeout() {
        let mut d = dispatcher();
        put_abc(&mut d, Properties::REQUIRES_TOUCH);

        let mut buf = [0u8; 512];
        buf[..CALC_ABC.len()].copy_from_slice(&CALC_ABC);
        assert_eq!(d.dispatch(&mut buf, CALC_ABC.len(), 0), Dispatch::Pending);
        assert_eq!(d.poll(&mut buf, None, 15_000), Some(Dispatch::Pending));
        assert_eq!(d.poll(&mut buf, None, 15_001), Some(Dispatch::Complete(2)));
        assert_eq!(&buf[..2], &[0x69, 0x82]);
        assert!(!d.is_waiting());
    }

    #[test]
    fn test_touch_gated_policy_checked_first() {
        let mut d = dispatcher();
        put_abc(&mut d, Properties::REQUIRES_TOUCH | Properties::INCREASING_ONLY);

        let mut buf = [0u8; 512];
        buf[..CALC_ABC.len()].copy_from_slice(&CALC_ABC);
        assert_eq!(d.dispatch(&mut buf, CALC_ABC.len(), 0), Dispatch::Pending);
        assert_eq!(
            d.poll(&mut buf, Some(Gesture::Long), 10),
            Some(Dispatch::Complete(9))
        );

        // Same challenge is rejected without waiting for a touch
        assert_eq!(exchange(&mut d, &CALC_ABC), vec![0x69, 0x82]);
    }

    #[test]
    fn test_touch_round_trip_via_apdus() {
        let mut d = dispatcher();
        let mut put = vec![0x00, 0x01, 0x00, 0x00, 0x12];
        put.extend_from_slice(&[
            0x71, 0x02, b'H', b'1', 0x73, 0x0C, 0x11, 0x06, b'H', b'e', b'l', b'l', b'o', b'!',
            0xDE, 0xAD, 0xBE, 0xEF,
        ]);
        assert_eq!(exchange(&mut d, &put), vec![0x90, 0x00]);
        assert_eq!(
            exchange(&mut d, &[0x00, 0x55, 0x01, 0x00, 0x04, 0x71, 0x02, b'H', b'1']),
            vec![0x90, 0x00]
        );

        for expected in [b"996554", b"602287", b"143627"] {
            assert_eq!(&d.handle_touch(1).unwrap()[..], expected);
        }

        assert_eq!(
            exchange(&mut d, &[0x00, 0x02, 0x00, 0x00, 0x04, 0x71, 0x02, b'H', b'1']),
            vec![0x90, 0x00]
        );
        assert!(d.handle_touch(1).unwrap().is_empty());
        assert_eq!(d.handle_touch(199).map(|o| o.len()), Err(StatusCode::WrongP1P2));
    }

    #[test]
    fn test_reload_keeps_bindings() {
        let store = alloc::sync::Arc::new(MemoryStore::new(4));
        let mut d =
            CommandDispatcher::new(OathConfig::new(), store.clone(), FixedClock(0)).unwrap();
        let mut apdu = vec![0x00, 0x43, 0x02, 0x00, 0x05];
        apdu.extend_from_slice(&[0x02, 0x02, b'p', b'w', 0x01]);
        let mut buf = [0u8; 64];
        buf[..apdu.len()].copy_from_slice(&apdu);
        assert_eq!(d.dispatch(&mut buf, apdu.len(), 0), Dispatch::Complete(2));

        let mut rebooted = CommandDispatcher::new(OathConfig::new(), store, FixedClock(0)).unwrap();
        assert_eq!(&rebooted.handle_touch(2).unwrap()[..], b"pw\r");
        rebooted.reload().unwrap();
        assert_eq!(&rebooted.handle_touch(2).unwrap()[..], b"pw\r");
    }
}
