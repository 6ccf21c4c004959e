//! Touch-output application
//!
//! Maps the two physical gestures to what the device types when they occur:
//! the current code of a bound OATH credential, a static password, or nothing.
//! Bindings reference credentials by name only; a binding whose credential has
//! been deleted behaves as off until it is rebound.

use crate::oath::Oath;
use crate::status::{Result, StatusCode};
use crate::store::{Clock, CredentialStore};
use crate::types::{Gesture, SlotKind, SlotTable, TouchSlot};

use alloc::vec::Vec;

use log::{debug, error, info};
use zeroize::Zeroizing;

/// Appended after the output when a slot asks for it
pub const TERMINATOR: u8 = b'\r';

/// Characters to emit for one gesture, wiped on drop
pub type TouchOutput = Zeroizing<Vec<u8>>;

/// Touch-output state
#[derive(Debug, Default)]
pub struct Pass {
    slots: SlotTable,
}

impl Pass {
    /// Load bindings from the store, all slots off if none were saved
    pub fn load<S: CredentialStore>(store: &S) -> Result<Self> {
        let slots = store.load_slots()?.unwrap_or_default();
        Ok(Self { slots })
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    /// Effective binding for a slot
    ///
    /// An OATH binding whose credential no longer exists reads as off.
    pub fn resolve<S: CredentialStore>(&self, store: &S, gesture: Gesture) -> Result<TouchSlot> {
        let slot = self.slots.get(gesture);
        if let SlotKind::Oath { name } = &slot.kind {
            if store.get(name)?.is_none() {
                return Ok(TouchSlot::default());
            }
        }
        Ok(slot.clone())
    }

    /// Replace one binding and persist the table
    ///
    /// The in-memory table only changes once the store accepted the write.
    pub fn bind<S: CredentialStore>(
        &mut self,
        store: &S,
        gesture: Gesture,
        slot: TouchSlot,
    ) -> Result<()> {
        let mut table = self.slots.clone();
        *table.get_mut(gesture) = slot;
        store.save_slots(&table).map_err(|err| {
            error!("failed to persist touch slots: {}", err);
            err
        })?;
        self.slots = table;
        info!("touch slot {:?} rebound", gesture);
        Ok(())
    }

    /// Drop every binding without touching the store
    pub(crate) fn clear(&mut self) {
        self.slots = SlotTable::default();
    }

    /// Produce the output for a raw gesture code from the touch sensor
    ///
    /// Unknown codes are a caller error, not an empty output.
    pub fn handle_touch<S: CredentialStore, K: Clock>(
        &self,
        oath: &mut Oath<S, K>,
        code: u8,
    ) -> Result<TouchOutput> {
        let gesture = Gesture::from_u8(code).ok_or(StatusCode::WrongP1P2)?;
        self.on_gesture(oath, gesture)
    }

    /// Produce the output for a gesture
    pub fn on_gesture<S: CredentialStore, K: Clock>(
        &self,
        oath: &mut Oath<S, K>,
        gesture: Gesture,
    ) -> Result<TouchOutput> {
        let slot = self.slots.get(gesture);
        let mut out = Zeroizing::new(Vec::new());

        match &slot.kind {
            SlotKind::Off => return Ok(out),
            SlotKind::Oath { name } => match oath.next_code(name)? {
                Some(code) => out.extend_from_slice(code.as_bytes()),
                None => {
                    debug!("touch slot {:?} bound to a deleted credential", gesture);
                    return Ok(out);
                }
            },
            SlotKind::Static { password } => out.extend_from_slice(password.as_slice()),
        }

        if slot.with_enter {
            out.push(TERMINATOR);
        }
        Ok(out)
    }
}
