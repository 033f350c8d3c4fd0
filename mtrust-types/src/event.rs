//! Reader events
//!
//! Events are produced by the card session as operations complete and are
//! delivered through a bounded channel. Bridging them to a UI or RPC layer
//! is the consumer's concern.

use std::fmt;

use mtrust_core::CardUid;
use mtrust_core::constants::m1;

use crate::card::CardType;

/// Structured events emitted by a card session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    /// Transport opened and the read loop is running
    DeviceReady,

    /// The device went away or the transport was closed
    DeviceDetached,

    /// A card entered the field
    CardDetected { uid: CardUid, card_type: CardType },

    /// The previously reported card left the field (auto-poll only)
    CardRemoved,

    /// Outcome of a sector authentication
    AuthResult { success: bool, message: String },

    /// A data block was read successfully
    BlockRead { data: [u8; m1::BLOCK_SIZE] },

    /// An operation failed
    Error { code: ErrorCode, message: String },
}

/// Machine-readable error codes carried in [`ReaderEvent::Error`]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoCard,
    PollFailed,
    AuthFailed,
    ReadFailed,
    SendFailed,
    Timeout,
    InvalidData,
    DeviceError,
}

impl ErrorCode {
    /// Stable string form, suitable for logs and RPC payloads
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoCard => "NO_CARD",
            Self::PollFailed => "POLL_FAILED",
            Self::AuthFailed => "AUTH_FAILED",
            Self::ReadFailed => "READ_FAILED",
            Self::SendFailed => "SEND_FAILED",
            Self::Timeout => "TIMEOUT",
            Self::InvalidData => "INVALID_DATA",
            Self::DeviceError => "DEVICE_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
