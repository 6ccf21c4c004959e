//! CALCULATE and CALCULATE_ALL
//!
//! P2 bit 0 selects the truncated RESPONSE form (digits plus four masked MAC
//! bytes); otherwise the full MAC is returned in a FULL_RESPONSE.

use crate::apdu::{Command, Response};
use crate::commands::list::push_tlv;
use crate::oath::{MAX_CHALLENGE_LEN, Oath, admit_challenge, compute_mac, otp, tags};
use crate::status::{Result, StatusCode};
use crate::store::{Clock, CredentialStore};
use crate::tlv::TlvReader;
use crate::types::{CredentialRecord, MAX_NAME_LEN, OtpKind};

use alloc::vec::Vec;

use log::debug;
use otpkey_crypto::MacOutput;

/// Handle CALCULATE
pub fn calculate<S: CredentialStore, K: Clock>(
    oath: &mut Oath<S, K>,
    cmd: &Command,
    resp: &mut Response,
) -> Result<()> {
    let mut reader = TlvReader::new(cmd.data());
    let name = reader.expect(tags::NAME, 1, MAX_NAME_LEN)?;
    let challenge = reader.expect(tags::CHALLENGE, 1, MAX_CHALLENGE_LEN)?;
    let truncated = cmd.p2 & 0x01 != 0;

    let Some(mut record) = oath.store().get(name)? else {
        debug!("CALCULATE for unknown name");
        return Ok(());
    };

    let changed = admit_challenge(&mut record, challenge)?;
    if record.properties.requires_touch() && !oath.has_presence() {
        resp.defer_until_presence();
        return Ok(());
    }

    let mac = compute_mac(&record, challenge)?;
    let body = render_response(&record, &mac, truncated);
    if body.len() > resp.remaining() {
        return Err(StatusCode::WrongLength);
    }
    if changed {
        oath.persist(&record)?;
    }
    resp.extend_from_slice(&body)
}

/// Handle CALCULATE_ALL
///
/// Touch-gated records report TOUCH_REQUIRED and HOTP records NO_RESPONSE;
/// neither is computed. An increasing-only record whose baseline the
/// challenge does not exceed reports NO_RESPONSE instead of failing.
pub fn calculate_all<S: CredentialStore, K: Clock>(
    oath: &mut Oath<S, K>,
    cmd: &Command,
    resp: &mut Response,
) -> Result<()> {
    let challenge =
        TlvReader::new(cmd.data()).expect(tags::CHALLENGE, 1, MAX_CHALLENGE_LEN)?;
    let truncated = cmd.p2 & 0x01 != 0;

    let mut body = Vec::new();
    let mut advanced = Vec::new();
    for mut record in oath.store().iterate()? {
        push_tlv(&mut body, tags::NAME, &record.name);

        if record.properties.requires_touch() {
            push_tlv(&mut body, tags::TOUCH_REQUIRED, &[record.digits]);
            continue;
        }
        if record.algorithm.kind == OtpKind::Hotp {
            push_tlv(&mut body, tags::NO_RESPONSE, &[record.digits]);
            continue;
        }
        let Ok(changed) = admit_challenge(&mut record, challenge) else {
            push_tlv(&mut body, tags::NO_RESPONSE, &[record.digits]);
            continue;
        };

        let mac = compute_mac(&record, challenge)?;
        body.extend_from_slice(&render_response(&record, &mac, truncated));
        if changed {
            advanced.push(record);
        }
    }

    // Baselines move only once every code is computed
    for record in &advanced {
        oath.persist(record)?;
    }
    oath.begin_continuation(body, resp)
}

fn render_response(record: &CredentialRecord, mac: &MacOutput, truncated: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(3 + mac.len());
    if truncated {
        out.extend_from_slice(&[tags::RESPONSE, 5, record.digits]);
        out.extend_from_slice(&otp::truncated_bytes(mac));
    } else {
        out.extend_from_slice(&[tags::FULL_RESPONSE, (mac.len() + 1) as u8, record.digits]);
        out.extend_from_slice(mac);
    }
    out
}
