//! SELECT, LIST and SEND_REMAINING
//!
//! Listings are rendered in full and handed to the continuation, which sends
//! as much as the response can hold and reports the rest with `0x61XX`.

use crate::apdu::{Command, Response};
use crate::oath::{MAX_CHALLENGE_LEN, Oath, VERSION, tags};
use crate::status::{Result, StatusCode};
use crate::tlv::TlvReader;
use crate::store::{Clock, CredentialStore};

use alloc::vec::Vec;

/// Handle SELECT
///
/// Reports the version and device identifier; P2 = 1 appends the listing.
///
/// The data field is either empty or one CHALLENGE TLV. No access code is
/// ever configured, so a well-formed challenge is accepted and left
/// unanswered. Anything else is rejected as a malformed CHALLENGE would be.
pub fn select<S: CredentialStore, K: Clock>(
    oath: &mut Oath<S, K>,
    cmd: &Command,
    resp: &mut Response,
) -> Result<()> {
    if !cmd.data().is_empty() {
        let mut reader = TlvReader::new(cmd.data());
        reader.expect(tags::CHALLENGE, 1, MAX_CHALLENGE_LEN)?;
        if !reader.is_empty() {
            return Err(StatusCode::WrongLength);
        }
    }

    let mut body = Vec::new();
    push_tlv(&mut body, tags::VERSION, &VERSION);
    push_tlv(&mut body, tags::NAME, &oath.config().device_id);
    if cmd.p2 == 1 {
        render_listing(oath, false, &mut body)?;
    }
    oath.begin_continuation(body, resp)
}

/// Handle LIST
///
/// P2 = 1 appends each record's property byte after its name.
pub fn list<S: CredentialStore, K: Clock>(
    oath: &mut Oath<S, K>,
    cmd: &Command,
    resp: &mut Response,
) -> Result<()> {
    let mut body = Vec::new();
    render_listing(oath, cmd.p2 == 1, &mut body)?;
    oath.begin_continuation(body, resp)
}

/// Handle SEND_REMAINING
pub fn send_remaining<S: CredentialStore, K: Clock>(
    oath: &mut Oath<S, K>,
    _cmd: &Command,
    resp: &mut Response,
) -> Result<()> {
    oath.send_remaining(resp)
}

fn render_listing<S: CredentialStore, K: Clock>(
    oath: &Oath<S, K>,
    with_properties: bool,
    out: &mut Vec<u8>,
) -> Result<()> {
    for record in oath.store().iterate()? {
        let extra = if with_properties { 2 } else { 1 };
        out.push(tags::NAME_LIST);
        out.push((record.name.len() + extra) as u8);
        out.push(record.algorithm.to_u8());
        out.extend_from_slice(&record.name);
        if with_properties {
            out.push(record.properties.bits());
        }
    }
    Ok(())
}

pub(crate) fn push_tlv(out: &mut Vec<u8>, tag: u8, value: &[u8]) {
    out.push(tag);
    out.push(value.len() as u8);
    out.extend_from_slice(value);
}
