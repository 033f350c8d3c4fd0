//! Error types for mtrust-core

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Frame is too short to be valid
    #[error("Frame too short: expected at least {expected} bytes, got {actual} bytes")]
    FrameTooShort { expected: usize, actual: usize },

    /// First byte is not the 0xAA sentinel
    #[error("Bad frame header: expected 0xAA, got 0x{0:02X}")]
    BadHeader(u8),

    /// Declared payload length exceeds the remaining bytes
    #[error("Declared payload length {declared} overruns frame of {available} bytes")]
    LengthOverrun { declared: usize, available: usize },

    /// Checksum verification failed
    #[error("Checksum mismatch: expected 0x{expected:02X}, received 0x{received:02X}")]
    ChecksumMismatch { expected: u8, received: u8 },

    /// Payload too large to fit in a 64-byte frame
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge { size: usize, max: usize },

    /// Sector index outside the addressable range
    #[error("Invalid sector {0}: must be 0-15")]
    InvalidSector(u8),

    /// Unknown command code
    #[error("Unknown command code: 0x{0:02X}")]
    UnknownCommand(u8),

    /// Poll payload too short or malformed to carry a card UID
    #[error("Malformed UID payload: {0} bytes")]
    MalformedUid(usize),
}
