//! PUT: create a credential
//!
//! Data field: NAME, KEY, then PROPERTY and COUNTER in any order. Every TLV is
//! read before any semantic check so a truncated trailer is always reported
//! as a length error.

use crate::apdu::{Command, Response};
use crate::oath::{Oath, tags};
use crate::secret::Secret;
use crate::status::{Result, StatusCode};
use crate::store::{Clock, CredentialStore};
use crate::tlv::TlvReader;
use crate::types::{Algorithm, CredentialRecord, MAX_KEY_LEN, MAX_NAME_LEN, OtpKind, Properties};

use log::{debug, info};

/// Handle PUT
pub fn handle<S: CredentialStore, K: Clock>(
    oath: &mut Oath<S, K>,
    cmd: &Command,
    _resp: &mut Response,
) -> Result<()> {
    let mut reader = TlvReader::new(cmd.data());
    let name = reader.expect(tags::NAME, 1, MAX_NAME_LEN)?;
    // Algorithm byte and digit count precede the secret
    let key = reader.expect(tags::KEY, 2, MAX_KEY_LEN + 2)?;

    let mut properties = Properties::default();
    let mut counter = None;
    while let Some(tag) = reader.peek_tag() {
        match tag {
            tags::PROPERTY => {
                reader.read_byte()?;
                properties = Properties::from_bits(reader.read_byte()?);
            }
            tags::COUNTER => {
                let (_, len) = reader.read_header()?;
                if len != 4 {
                    return Err(StatusCode::WrongData);
                }
                let value = reader.read_value(len)?;
                counter = Some(u32::from_be_bytes([value[0], value[1], value[2], value[3]]));
            }
            _ => return Err(StatusCode::WrongData),
        }
    }

    let algorithm = Algorithm::from_u8(key[0]).ok_or(StatusCode::WrongData)?;
    let digits = key[1];
    if !(6..=8).contains(&digits) {
        return Err(StatusCode::WrongData);
    }
    if counter.is_some() && algorithm.kind != OtpKind::Hotp {
        return Err(StatusCode::WrongData);
    }

    if oath.store().get(name)?.is_some() {
        debug!("PUT rejected, name already present");
        return Err(StatusCode::ConditionsNotSatisfied);
    }
    if oath.store().count()? >= oath.record_limit() {
        return Err(StatusCode::NotEnoughSpace);
    }

    let record = CredentialRecord {
        name: name.to_vec(),
        algorithm,
        digits,
        secret: Secret::from_slice(&key[2..]),
        counter: counter.map(u64::from).unwrap_or(0),
        properties,
    };
    oath.persist(&record)?;
    info!(
        "credential created ({:?}, {} digits, properties {:#04x})",
        algorithm.kind,
        digits,
        properties.bits()
    );
    Ok(())
}
