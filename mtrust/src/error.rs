//! High-level error types

use mtrust_core::Status;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] mtrust_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] mtrust_transport::Error),

    /// Operation requires a card but none has been detected
    #[error("No card detected - poll for a card first")]
    NoCard,

    /// The card left the field mid-operation
    #[error("Card lost")]
    CardLost,

    /// The reader rejected the sector key
    #[error("Authentication failed - wrong key")]
    AuthFailed,

    /// The reader refused the block read
    #[error("Read failed - authenticate the sector first")]
    ReadFailed,

    /// A block read returned an unexpected payload size
    #[error("Unexpected block size: expected {expected} bytes, got {actual}")]
    DataIntegrity { expected: usize, actual: usize },

    /// The reader answered with a status this operation cannot handle
    #[error("Unexpected status: {0}")]
    UnexpectedStatus(Status),
}

impl Error {
    /// Check if a retry of the same operation might succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoCard
                | Self::CardLost
                | Self::Transport(mtrust_transport::Error::ResponseTimeout(_))
        )
    }
}
