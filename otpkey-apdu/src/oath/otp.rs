//! RFC 4226 dynamic truncation and decimal formatting

/// Four MAC bytes selected by the dynamic offset, top bit cleared
///
/// This is the binary form carried in the truncated RESPONSE TLV.
pub fn truncated_bytes(mac: &[u8]) -> [u8; 4] {
    let offset = (mac[mac.len() - 1] & 0x0F) as usize;
    [
        mac[offset] & 0x7F,
        mac[offset + 1],
        mac[offset + 2],
        mac[offset + 3],
    ]
}

/// 31-bit dynamic truncation value
pub fn truncate(mac: &[u8]) -> u32 {
    u32::from_be_bytes(truncated_bytes(mac))
}

/// Decimal code of `digits` length
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct OtpCode {
    buf: [u8; 8],
    len: usize,
}

impl OtpCode {
    /// Reduce a truncation value to `digits` decimal digits, zero padded
    ///
    /// `digits` is clamped to 1..=8.
    pub fn new(value: u32, digits: u8) -> Self {
        let len = digits.clamp(1, 8) as usize;
        let mut code = value % 10u32.pow(len as u32);
        let mut buf = [b'0'; 8];
        for slot in buf[..len].iter_mut().rev() {
            *slot = b'0' + (code % 10) as u8;
            code /= 10;
        }
        Self { buf, len }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl core::fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OtpCode").field("len", &self.len).finish()
    }
}
