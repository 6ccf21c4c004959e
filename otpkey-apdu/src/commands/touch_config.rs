//! SET_DEFAULT, READ_CONFIG and WRITE_CONFIG
//!
//! Touch slots are addressed by P1: 1 for the short gesture, 2 for the long
//! one.

use crate::apdu::{Command, Response};
use crate::oath::{Oath, tags};
use crate::pass::Pass;
use crate::secret::Secret;
use crate::status::{Result, StatusCode};
use crate::store::{Clock, CredentialStore};
use crate::tlv::TlvReader;
use crate::types::{Gesture, MAX_NAME_LEN, MAX_PASSWORD_LEN, SlotKind, TouchSlot};

fn slot_from_p1(p1: u8) -> Result<Gesture> {
    Gesture::from_u8(p1).ok_or(StatusCode::WrongP1P2)
}

fn ensure_exists<S: CredentialStore, K: Clock>(oath: &Oath<S, K>, name: &[u8]) -> Result<()> {
    match oath.store().get(name)? {
        Some(_) => Ok(()),
        None => Err(StatusCode::DataInvalid),
    }
}

/// Handle SET_DEFAULT: bind a credential to a slot
///
/// P2 bit 0 requests the terminator after the code.
pub fn set_default<S: CredentialStore, K: Clock>(
    oath: &mut Oath<S, K>,
    pass: &mut Pass,
    cmd: &Command,
    _resp: &mut Response,
) -> Result<()> {
    let name = TlvReader::new(cmd.data()).expect(tags::NAME, 1, MAX_NAME_LEN)?;
    let gesture = slot_from_p1(cmd.p1)?;
    ensure_exists(oath, name)?;

    let slot = TouchSlot {
        kind: SlotKind::Oath {
            name: name.to_vec(),
        },
        with_enter: cmd.p2 & 0x01 != 0,
    };
    pass.bind(oath.store(), gesture, slot)
}

/// Handle READ_CONFIG
///
/// Per slot: type byte, then the credential name for OATH slots, then the
/// terminator flag for any slot that is not off. Static passwords are never
/// read back.
pub fn read_config<S: CredentialStore, K: Clock>(
    oath: &Oath<S, K>,
    pass: &Pass,
    _cmd: &Command,
    resp: &mut Response,
) -> Result<()> {
    for gesture in [Gesture::Short, Gesture::Long] {
        let slot = pass.resolve(oath.store(), gesture)?;
        resp.push(slot.kind.type_byte())?;
        match &slot.kind {
            SlotKind::Off => continue,
            SlotKind::Oath { name } => {
                resp.push(name.len() as u8)?;
                resp.extend_from_slice(name)?;
            }
            SlotKind::Static { .. } => {}
        }
        resp.push(slot.with_enter as u8)?;
    }
    Ok(())
}

/// Handle WRITE_CONFIG
///
/// Data field: `type [len value] with_enter`, the bracketed part present for
/// OATH and static slots only.
pub fn write_config<S: CredentialStore, K: Clock>(
    oath: &mut Oath<S, K>,
    pass: &mut Pass,
    cmd: &Command,
    _resp: &mut Response,
) -> Result<()> {
    let gesture = slot_from_p1(cmd.p1)?;
    let mut reader = TlvReader::new(cmd.data());
    let kind_byte = reader.read_byte()?;

    let kind = match kind_byte {
        SlotKind::OFF => SlotKind::Off,
        SlotKind::OATH | SlotKind::STATIC => {
            let len = reader.read_byte()? as usize;
            let max = if kind_byte == SlotKind::OATH {
                MAX_NAME_LEN
            } else {
                MAX_PASSWORD_LEN
            };
            if len == 0 || len > max {
                return Err(StatusCode::WrongLength);
            }
            let value = reader.read_value(len)?;
            if kind_byte == SlotKind::OATH {
                ensure_exists(oath, value)?;
                SlotKind::Oath {
                    name: value.to_vec(),
                }
            } else {
                SlotKind::Static {
                    password: Secret::from_slice(value),
                }
            }
        }
        _ => return Err(StatusCode::WrongData),
    };
    let with_enter = reader.read_byte()? != 0;
    if !reader.is_empty() {
        return Err(StatusCode::WrongLength);
    }

    pass.bind(oath.store(), gesture, TouchSlot { kind, with_enter })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{oath, put_totp};
    use crate::oath::OathConfig;
    use crate::store::{FixedClock, MemoryStore};

    fn exec<F>(p1: u8, p2: u8, data: &[u8], f: F) -> (Vec<u8>, u16)
    where
        F: FnOnce(&Command, &mut Response) -> Result<()>,
    {
        let mut raw = vec![0x00, 0x43, p1, p2, data.len() as u8];
        raw.extend_from_slice(data);
        let cmd = Command::parse(&raw).unwrap();
        let mut buf = [0u8; 256];
        let mut resp = Response::new(&mut buf);
        match f(&cmd, &mut resp) {
            Ok(()) => (resp.data().to_vec(), resp.status()),
            Err(status) => (Vec::new(), status.to_u16()),
        }
    }

    #[test]
    fn test_set_default_and_read() {
        let mut oath = oath(4);
        let mut pass = Pass::default();
        put_totp(&mut oath, b"abc", 0);

        let name_tlv = [0x71, 0x03, b'a', b'b', b'c'];
        let (_, sw) = exec(2, 1, &name_tlv, |c, r| set_default(&mut oath, &mut pass, c, r));
        assert_eq!(sw, 0x9000);

        let (data, sw) = exec(0, 0, &[], |c, r| read_config(&oath, &pass, c, r));
        assert_eq!(sw, 0x9000);
        assert_eq!(data, vec![0x00, 0x01, 0x03, b'a', b'b', b'c', 0x01]);

        // Deleted credential reads as off
        oath.store().delete(b"abc").unwrap();
        let (data, _) = exec(0, 0, &[], |c, r| read_config(&oath, &pass, c, r));
        assert_eq!(data, vec![0x00, 0x00]);
    }

    #[test]
    fn test_set_default_errors() {
        let mut oath = oath(4);
        let mut pass = Pass::default();
        let (_, sw) = exec(1, 0, &[0x71], |c, r| set_default(&mut oath, &mut pass, c, r));
        assert_eq!(sw, 0x6700);
        let (_, sw) = exec(1, 0, &[0x71, 0x01, b'x'], |c, r| {
            set_default(&mut oath, &mut pass, c, r)
        });
        assert_eq!(sw, 0x6984);
        put_totp(&mut oath, b"x", 0);
        let (_, sw) = exec(3, 0, &[0x71, 0x01, b'x'], |c, r| {
            set_default(&mut oath, &mut pass, c, r)
        });
        assert_eq!(sw, 0x6B00);
    }

    #[test]
    fn test_static_password_limits() {
        let mut oath = Oath::new(OathConfig::new(), MemoryStore::new(2), FixedClock(0));
        let mut pass = Pass::default();
        let password = b"a0aaa0a0a0aaaaa0a0a00a0a0bbabba0x";

        let mut data = vec![0x02, 33];
        data.extend_from_slice(password);
        data.push(0);
        let (_, sw) = exec(2, 0, &data, |c, r| write_config(&mut oath, &mut pass, c, r));
        assert_eq!(sw, 0x6700);

        let mut data = vec![0x02, 32];
        data.extend_from_slice(&password[..32]);
        data.push(1);
        let (_, sw) = exec(2, 0, &data, |c, r| write_config(&mut oath, &mut pass, c, r));
        assert_eq!(sw, 0x9000);

        let out = pass.on_gesture(&mut oath, Gesture::Long).unwrap();
        assert_eq!(&out[..32], &password[..32]);
        assert_eq!(out[32], b'\r');

        // Never read back
        let (data, _) = exec(0, 0, &[], |c, r| read_config(&oath, &pass, c, r));
        assert_eq!(data, vec![0x00, 0x02, 0x01]);
    }

    #[test]
    fn test_write_config_layout() {
        let mut oath = Oath::new(OathConfig::new(), MemoryStore::new(2), FixedClock(0));
        let mut pass = Pass::default();

        // Missing terminator flag
        let (_, sw) = exec(1, 0, &[0x02, 0x02, b'p', b'w'], |c, r| {
            write_config(&mut oath, &mut pass, c, r)
        });
        assert_eq!(sw, 0x6700);
        // Trailing garbage
        let (_, sw) = exec(1, 0, &[0x00, 0x00, 0x00], |c, r| {
            write_config(&mut oath, &mut pass, c, r)
        });
        assert_eq!(sw, 0x6700);
        // Unknown type
        let (_, sw) = exec(1, 0, &[0x07, 0x00], |c, r| {
            write_config(&mut oath, &mut pass, c, r)
        });
        assert_eq!(sw, 0x6A80);
        // Unknown credential
        let (_, sw) = exec(1, 0, &[0x01, 0x01, b'q', 0x00], |c, r| {
            write_config(&mut oath, &mut pass, c, r)
        });
        assert_eq!(sw, 0x6984);
        // Off
        let (_, sw) = exec(1, 0, &[0x00, 0x00], |c, r| {
            write_config(&mut oath, &mut pass, c, r)
        });
        assert_eq!(sw, 0x9000);
        assert_eq!(oath.store().load_slots().unwrap(), Some(pass.slots().clone()));
    }
}
