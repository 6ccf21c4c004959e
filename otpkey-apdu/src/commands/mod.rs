//! Command handlers
//!
//! One module per command family. Handlers take the application state, the
//! parsed command and the response under construction, and return `Ok(())`
//! or the status word to report. A handler that fails must not have changed
//! any state.

pub mod calculate;
pub mod delete;
pub mod list;
pub mod put;
pub mod reset;
pub mod touch_config;

/// Supported instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Put,
    Delete,
    Reset,
    SetDefault,
    List,
    Calculate,
    Select,
    CalculateAll,
    SendRemaining,
    ReadConfig,
    WriteConfig,
}

impl Instruction {
    pub const PUT: u8 = 0x01;
    pub const DELETE: u8 = 0x02;
    pub const RESET: u8 = 0x04;
    pub const READ_CONFIG: u8 = 0x42;
    pub const WRITE_CONFIG: u8 = 0x43;
    pub const SET_DEFAULT: u8 = 0x55;
    pub const LIST: u8 = 0xA1;
    pub const CALCULATE: u8 = 0xA2;
    pub const SELECT: u8 = 0xA4;
    pub const SEND_REMAINING: u8 = 0xA5;
    pub const CALCULATE_ALL: u8 = 0xA6;
    /// ISO GET RESPONSE, accepted as SEND_REMAINING
    pub const GET_RESPONSE: u8 = 0xC0;

    /// Decode INS; `0xA4` is SELECT only when P1 carries the by-name marker
    pub fn from_apdu(ins: u8, p1: u8) -> Option<Self> {
        match ins {
            Self::PUT => Some(Self::Put),
            Self::DELETE => Some(Self::Delete),
            Self::RESET => Some(Self::Reset),
            Self::READ_CONFIG => Some(Self::ReadConfig),
            Self::WRITE_CONFIG => Some(Self::WriteConfig),
            Self::SET_DEFAULT => Some(Self::SetDefault),
            Self::LIST => Some(Self::List),
            Self::CALCULATE => Some(Self::Calculate),
            Self::SELECT if p1 == 0x04 => Some(Self::Select),
            Self::SELECT => Some(Self::CalculateAll),
            Self::SEND_REMAINING | Self::GET_RESPONSE => Some(Self::SendRemaining),
            Self::CALCULATE_ALL => Some(Self::CalculateAll),
            _ => None,
        }
    }
}
