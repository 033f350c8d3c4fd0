//! Card session state machine
//!
//! State is owned by one [`CardSession`](crate::CardSession) per open
//! device and mutated only in response to decoded reader statuses.
//! A card-loss status always resets to [`CardState::NoCard`]; the state is
//! never left half-authenticated.

use mtrust_core::{CardUid, KeyType};

/// Session state for the card currently in (or absent from) the field
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CardState {
    /// No card detected
    NoCard,

    /// A card was detected by polling
    Present { uid: CardUid },

    /// A sector of the detected card has been authenticated
    Authenticated {
        uid: CardUid,
        sector: u8,
        key_type: KeyType,
    },
}

impl CardState {
    /// UID of the detected card, if any
    pub fn uid(&self) -> Option<CardUid> {
        match self {
            Self::NoCard => None,
            Self::Present { uid } | Self::Authenticated { uid, .. } => Some(*uid),
        }
    }

    /// Check whether a card is in the field
    pub fn has_card(&self) -> bool {
        !matches!(self, Self::NoCard)
    }
}
