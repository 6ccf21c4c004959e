//! Common test utilities for otpkey integration tests
//!
//! APDU builders for the OATH instructions and a device wrapper that runs
//! each command through the card transport.

#![allow(dead_code)]

use otpkey::{Device, DeviceConfig, FileStore, OathConfig, SystemClock};
use otpkey_apdu::{FixedClock, MemoryStore};

pub const TAG_NAME: u8 = 0x71;
pub const TAG_KEY: u8 = 0x73;
pub const TAG_CHALLENGE: u8 = 0x74;
pub const TAG_PROPERTY: u8 = 0x78;
pub const TAG_COUNTER: u8 = 0x7A;

pub const INS_PUT: u8 = 0x01;
pub const INS_DELETE: u8 = 0x02;
pub const INS_SET_DEFAULT: u8 = 0x55;
pub const INS_READ_CONFIG: u8 = 0x42;
pub const INS_WRITE_CONFIG: u8 = 0x43;
pub const INS_LIST: u8 = 0xA1;
pub const INS_CALCULATE: u8 = 0xA2;
pub const INS_SEND_REMAINING: u8 = 0xA5;

/// RFC 4226 Appendix D secret
pub const RFC4226_KEY: &[u8] = b"12345678901234567890";

/// Short APDU with optional data and Le
pub fn apdu(ins: u8, p1: u8, p2: u8, data: &[u8], le: Option<u8>) -> Vec<u8> {
    let mut out = vec![0x00, ins, p1, p2];
    if !data.is_empty() {
        out.push(data.len() as u8);
        out.extend_from_slice(data);
    }
    if let Some(le) = le {
        out.push(le);
    }
    out
}

pub fn tlv(tag: u8, value: &[u8]) -> Vec<u8> {
    let mut out = vec![tag, value.len() as u8];
    out.extend_from_slice(value);
    out
}

/// PUT body: NAME, KEY and optional extra TLVs
pub fn put_body(name: &[u8], algo: u8, digits: u8, key: &[u8], extra: &[u8]) -> Vec<u8> {
    let mut key_value = vec![algo, digits];
    key_value.extend_from_slice(key);
    let mut body = tlv(TAG_NAME, name);
    body.extend(tlv(TAG_KEY, &key_value));
    body.extend_from_slice(extra);
    body
}

/// Split a response into body and status word
pub fn split(response: &[u8]) -> (&[u8], u16) {
    let (body, sw) = response.split_at(response.len() - 2);
    (body, u16::from_be_bytes([sw[0], sw[1]]))
}

pub type MemoryDevice = Device<MemoryStore, FixedClock>;

pub fn memory_device(slots: usize) -> MemoryDevice {
    Device::with_store(DeviceConfig::default(), MemoryStore::new(slots), FixedClock(0)).unwrap()
}

pub fn memory_device_with(oath: OathConfig, slots: usize, unix_time: u64) -> MemoryDevice {
    let config = DeviceConfig::builder().oath(oath).build();
    Device::with_store(config, MemoryStore::new(slots), FixedClock(unix_time)).unwrap()
}

pub fn file_device(dir: &std::path::Path, slots: usize) -> Device<FileStore, SystemClock> {
    let config = DeviceConfig::builder()
        .storage_dir(dir)
        .record_slots(slots)
        .build();
    Device::open(config).unwrap()
}

/// Exchange one command that must complete immediately
pub fn send<S, K>(device: &mut Device<S, K>, command: &[u8]) -> (Vec<u8>, u16)
where
    S: otpkey_apdu::CredentialStore,
    K: otpkey_apdu::Clock,
{
    let response = device
        .exchange(command, 0)
        .unwrap()
        .expect("command waits for presence");
    let (body, sw) = split(&response);
    (body.to_vec(), sw)
}

/// Trigger a gesture and return what the device typed
pub fn touch<S, K>(device: &mut Device<S, K>, gesture: otpkey::Gesture) -> Vec<u8>
where
    S: otpkey_apdu::CredentialStore,
    K: otpkey_apdu::Clock,
{
    let tick = device.tick(0, Some(gesture)).unwrap();
    tick.typed.map(|typed| typed.to_vec()).unwrap_or_default()
}
