//! Error types for device operations

use std::fmt;

use otpkey_apdu::StatusCode;

/// Error type for device operations
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Command engine failure
    Status(StatusCode),
    /// Buffer arbitration or transport failure
    Transport(otpkey_transport::Error),
    /// Storage directory could not be opened or read
    IoError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Status(status) => write!(f, "Engine error: {}", status),
            Error::Transport(err) => write!(f, "Transport error: {}", err),
            Error::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<StatusCode> for Error {
    fn from(status: StatusCode) -> Self {
        Error::Status(status)
    }
}

impl From<otpkey_transport::Error> for Error {
    fn from(err: otpkey_transport::Error) -> Self {
        Error::Transport(err)
    }
}

// Conversion from IO errors
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IoError(error.to_string())
    }
}

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, Error>;
