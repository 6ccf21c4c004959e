//! Transport layer error types

use std::fmt;

use crate::broker::Owner;

/// Transport layer result type
pub type Result<T> = std::result::Result<T, Error>;

/// Transport layer errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Another transport holds the command buffer
    Busy(Owner),

    /// Caller does not hold the command buffer
    NotOwner,

    /// Request not valid in the current transport state
    InvalidState,

    /// Unknown control request
    InvalidRequest(u8),

    /// Command larger than the shared buffer
    MessageTooLarge,

    /// I/O error
    IoError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Busy(owner) => write!(f, "Command buffer busy (held by {:?})", owner),
            Error::NotOwner => write!(f, "Command buffer not held by caller"),
            Error::InvalidState => write!(f, "Request not valid in current state"),
            Error::InvalidRequest(req) => write!(f, "Unknown control request 0x{:02X}", req),
            Error::MessageTooLarge => write!(f, "Message too large"),
            Error::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err.to_string())
    }
}
