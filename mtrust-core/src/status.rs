//! MT3 protocol status codes (reader to host)

use std::fmt;

/// Response status byte
///
/// Unknown bytes are preserved as [`Status::Other`] rather than rejected,
/// so a firmware revision with extra codes does not break frame decoding.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    /// Operation succeeded
    Success,

    /// No card in the field
    NoCard,

    /// Sector authentication failed (wrong key)
    AuthFailed,

    /// Block read failed (sector not authenticated, or card error)
    ReadFailed,

    /// Reader-side timeout
    Timeout,

    /// Command parameters rejected by the reader
    InvalidParam,

    /// Internal reader error
    DeviceError,

    /// Unrecognized status byte
    Other(u8),
}

impl Status {
    /// Decode a raw status byte
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => Self::Success,
            0x01 => Self::NoCard,
            0x02 => Self::AuthFailed,
            0x03 => Self::ReadFailed,
            0x04 => Self::Timeout,
            0x05 => Self::InvalidParam,
            0xFF => Self::DeviceError,
            other => Self::Other(other),
        }
    }

    /// Wire representation of this status
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Success => 0x00,
            Self::NoCard => 0x01,
            Self::AuthFailed => 0x02,
            Self::ReadFailed => 0x03,
            Self::Timeout => 0x04,
            Self::InvalidParam => 0x05,
            Self::DeviceError => 0xFF,
            Self::Other(byte) => byte,
        }
    }

    /// Check if this status reports success
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::NoCard => write!(f, "NO_CARD"),
            Self::AuthFailed => write!(f, "AUTH_FAILED"),
            Self::ReadFailed => write!(f, "READ_FAILED"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::InvalidParam => write!(f, "INVALID_PARAM"),
            Self::DeviceError => write!(f, "DEVICE_ERROR"),
            Self::Other(byte) => write!(f, "UNKNOWN(0x{byte:02X})"),
        }
    }
}
