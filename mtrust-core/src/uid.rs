//! Card UID extraction and sector key types

use std::fmt;

use crate::constants::m1;
use crate::error::{Error, Result};

/// Unique identifier of a detected card, 4 or 7 bytes
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CardUid {
    /// Single-size UID (Mifare Classic 1K)
    Single([u8; m1::UID_LENGTH_4]),

    /// Double-size UID (Mifare Classic 4K)
    Double([u8; m1::UID_LENGTH_7]),
}

impl CardUid {
    /// Extract a UID from a POLL_CARD response payload.
    ///
    /// Heuristic: a payload of 7+ bytes whose first byte is nonzero is taken
    /// as a double-size UID, otherwise the first 4 bytes are used. This is
    /// inferred from reader behavior, not a documented rule.
    pub fn from_poll_payload(payload: &[u8]) -> Result<Self> {
        if payload.len() >= m1::UID_LENGTH_7 && payload[0] != 0 {
            let mut uid = [0u8; m1::UID_LENGTH_7];
            uid.copy_from_slice(&payload[..m1::UID_LENGTH_7]);
            Ok(Self::Double(uid))
        } else if payload.len() >= m1::UID_LENGTH_4 {
            let mut uid = [0u8; m1::UID_LENGTH_4];
            uid.copy_from_slice(&payload[..m1::UID_LENGTH_4]);
            Ok(Self::Single(uid))
        } else {
            Err(Error::MalformedUid(payload.len()))
        }
    }

    /// UID bytes
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Single(bytes) => bytes,
            Self::Double(bytes) => bytes,
        }
    }

    /// UID length in bytes (4 or 7)
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for CardUid {
    /// Colon-separated upper hex, e.g. `04:A3:7F:1C`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.as_bytes().iter().enumerate() {
            if i > 0 {
                write!(f, ":")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

/// Which of the two per-sector authentication keys to present
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// Key A (wire byte 0x60)
    KeyA,

    /// Key B (wire byte 0x61)
    KeyB,
}

impl KeyType {
    /// Wire byte carried in the AUTH_SECTOR payload
    pub fn wire_byte(self) -> u8 {
        match self {
            Self::KeyA => 0x60,
            Self::KeyB => 0x61,
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyA => write!(f, "KeyA"),
            Self::KeyB => write!(f, "KeyB"),
        }
    }
}
