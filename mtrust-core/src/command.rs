//! MT3 protocol command definitions

use std::fmt;

use crate::error::{Error, Result};

/// Protocol command codes (host to reader)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Query reader status
    GetStatus = 0x20,

    /// Poll for a card in the field, returns the UID
    PollCard = 0x30,

    /// Authenticate a sector with key A or key B
    AuthSector = 0x40,

    /// Read one 16-byte data block
    ReadBlock = 0x50,

    /// Write one data block (reserved, not implemented by this library)
    WriteBlock = 0x51,

    /// Halt the selected card
    HaltCard = 0x60,
}

impl From<Command> for u8 {
    fn from(cmd: Command) -> u8 {
        cmd as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x20 => Ok(Self::GetStatus),
            0x30 => Ok(Self::PollCard),
            0x40 => Ok(Self::AuthSector),
            0x50 => Ok(Self::ReadBlock),
            0x51 => Ok(Self::WriteBlock),
            0x60 => Ok(Self::HaltCard),
            other => Err(Error::UnknownCommand(other)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GetStatus => "GET_STATUS",
            Self::PollCard => "POLL_CARD",
            Self::AuthSector => "AUTH_SECTOR",
            Self::ReadBlock => "READ_BLOCK",
            Self::WriteBlock => "WRITE_BLOCK",
            Self::HaltCard => "HALT_CARD",
        };
        write!(f, "{name}")
    }
}
