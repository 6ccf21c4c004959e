//! Reader for the one-byte-tag, one-byte-length TLVs carried in OATH commands
//!
//! Error mapping is uniform across commands: running out of bytes is a length
//! error, anything present but unacceptable is a data error. Declared lengths
//! are range-checked before the value bytes are required to be present.

use crate::status::{Result, StatusCode};

/// Sequential TLV reader over a command data field
#[derive(Debug, Clone)]
pub struct TlvReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> TlvReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// True once every byte has been consumed
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Tag of the next TLV without consuming it
    pub fn peek_tag(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Consume a single byte
    pub fn read_byte(&mut self) -> Result<u8> {
        let byte = *self.data.get(self.pos).ok_or(StatusCode::WrongLength)?;
        self.pos += 1;
        Ok(byte)
    }

    /// Read a tag and its declared length
    pub fn read_header(&mut self) -> Result<(u8, usize)> {
        let tag = self.read_byte()?;
        let len = self.read_byte()? as usize;
        Ok((tag, len))
    }

    /// Consume `len` value bytes
    pub fn read_value(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(StatusCode::WrongLength)?;
        let value = self.data.get(self.pos..end).ok_or(StatusCode::WrongLength)?;
        self.pos = end;
        Ok(value)
    }

    /// Read a TLV that must carry `tag` with a length in `min..=max`
    pub fn expect(&mut self, tag: u8, min: usize, max: usize) -> Result<&'a [u8]> {
        let (found, len) = self.read_header()?;
        if found != tag || len < min || len > max {
            return Err(StatusCode::WrongData);
        }
        self.read_value(len)
    }
}
