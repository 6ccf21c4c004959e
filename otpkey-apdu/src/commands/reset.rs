//! RESET: wipe every credential and touch binding
//!
//! P1P2 must be `0xDEAD` so a stray command cannot erase the device.

use crate::apdu::{Command, Response};
use crate::oath::Oath;
use crate::pass::Pass;
use crate::status::{Result, StatusCode};
use crate::store::{Clock, CredentialStore};

use log::{error, warn};

const RESET_P1P2: u16 = 0xDEAD;

/// Handle RESET
pub fn handle<S: CredentialStore, K: Clock>(
    oath: &mut Oath<S, K>,
    pass: &mut Pass,
    cmd: &Command,
    _resp: &mut Response,
) -> Result<()> {
    if cmd.p1p2() != RESET_P1P2 {
        return Err(StatusCode::WrongP1P2);
    }
    oath.store().reset().map_err(|err| {
        error!("failed to wipe credential store: {}", err);
        err
    })?;
    pass.clear();
    warn!("OATH application reset, all credentials erased");
    Ok(())
}
