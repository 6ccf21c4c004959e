//! Command / response APDU views over the shared buffer
//!
//! A [`Command`] borrows its data field straight out of the transport buffer
//! and a [`Response`] writes into the free space behind it. Neither type owns
//! memory, so neither can outlive the buffer lease that produced it.

use crate::status::{Result, StatusCode};

/// Expected length when a short command omits Le
pub const SHORT_LE_DEFAULT: usize = 0x100;

/// Expected length when an extended command omits Le
pub const EXTENDED_LE_DEFAULT: usize = 0x10000;

const HEADER_LEN: usize = 4;

/// Parsed command APDU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'a> {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    data: &'a [u8],
    le: usize,
}

impl<'a> Command<'a> {
    /// Parse an ISO 7816-4 command, short or extended
    ///
    /// Accepted layouts are cases 1, 2S, 3S, 4S, 2E, 3E and 4E. Any layout where
    /// the declared Lc/Le fields disagree with the number of supplied bytes is
    /// rejected with `WrongLength`.
    pub fn parse(raw: &'a [u8]) -> Result<Self> {
        if raw.len() < HEADER_LEN {
            return Err(StatusCode::WrongLength);
        }

        let (cla, ins, p1, p2) = (raw[0], raw[1], raw[2], raw[3]);
        let body = &raw[HEADER_LEN..];

        let (data, le) = match body.len() {
            // Case 1
            0 => (&body[..0], SHORT_LE_DEFAULT),
            // Case 2S
            1 => (&body[..0], short_le(body[0])),
            _ if body[0] != 0 => {
                let lc = body[0] as usize;
                match body.len() - 1 {
                    // Case 3S
                    n if n == lc => (&body[1..], SHORT_LE_DEFAULT),
                    // Case 4S
                    n if n == lc + 1 => (&body[1..=lc], short_le(body[lc + 1])),
                    _ => return Err(StatusCode::WrongLength),
                }
            }
            // Case 2E
            3 => (&body[..0], extended_le(&body[1..3])),
            n if n < 3 => return Err(StatusCode::WrongLength),
            _ => {
                let lc = u16::from_be_bytes([body[1], body[2]]) as usize;
                if lc == 0 {
                    return Err(StatusCode::WrongLength);
                }
                match body.len() - 3 {
                    // Case 3E
                    n if n == lc => (&body[3..], EXTENDED_LE_DEFAULT),
                    // Case 4E
                    n if n == lc + 2 => (&body[3..3 + lc], extended_le(&body[3 + lc..])),
                    _ => return Err(StatusCode::WrongLength),
                }
            }
        };

        Ok(Self {
            cla,
            ins,
            p1,
            p2,
            data,
            le,
        })
    }

    /// Data field
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Lc
    pub fn lc(&self) -> usize {
        self.data.len()
    }

    /// Expected response length, already defaulted when absent
    pub fn le(&self) -> usize {
        self.le
    }

    /// P1 and P2 as one big-endian word
    pub fn p1p2(&self) -> u16 {
        u16::from_be_bytes([self.p1, self.p2])
    }
}

fn short_le(byte: u8) -> usize {
    if byte == 0 {
        SHORT_LE_DEFAULT
    } else {
        byte as usize
    }
}

fn extended_le(bytes: &[u8]) -> usize {
    match u16::from_be_bytes([bytes[0], bytes[1]]) {
        0 => EXTENDED_LE_DEFAULT,
        le => le as usize,
    }
}

/// Response under construction
///
/// Writes past the end of the view fail with `WrongLength` and leave the
/// already-written bytes untouched.
#[derive(Debug)]
pub struct Response<'a> {
    buf: &'a mut [u8],
    len: usize,
    sw: u16,
    deferred: bool,
}

impl<'a> Response<'a> {
    /// Wrap free buffer space
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            len: 0,
            sw: StatusCode::Success.to_u16(),
            deferred: false,
        }
    }

    /// Total bytes this response may hold
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes still available
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.len
    }

    pub fn push(&mut self, byte: u8) -> Result<()> {
        self.extend_from_slice(&[byte])
    }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.remaining() {
            return Err(StatusCode::WrongLength);
        }
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }

    /// Bytes written so far
    pub fn data(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Status word that will terminate the response
    pub fn status(&self) -> u16 {
        self.sw
    }

    pub fn set_status(&mut self, sw: u16) {
        self.sw = sw;
    }

    /// Drop the body, keep the buffer
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Hold this command until the user confirms presence
    ///
    /// The dispatcher re-runs the same command once a gesture arrives, so a
    /// handler must not have changed any state before calling this.
    pub fn defer_until_presence(&mut self) {
        self.len = 0;
        self.deferred = true;
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred
    }
}
