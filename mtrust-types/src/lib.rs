//! Shared type definitions for mtrust

pub mod card;
pub mod event;

pub use card::CardType;
pub use event::{ErrorCode, ReaderEvent};
