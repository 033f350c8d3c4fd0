//! Card classification

use std::fmt;

use mtrust_core::CardUid;

/// Card subtype, inferred from the UID length.
///
/// Informational only: the reader protocol does not change based on the
/// card subtype.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CardType {
    /// 4-byte UID
    MifareClassic1k,

    /// 7-byte UID
    MifareClassic4k,
}

impl CardType {
    /// Classify a card by its UID
    pub fn from_uid(uid: &CardUid) -> Self {
        match uid {
            CardUid::Single(_) => Self::MifareClassic1k,
            CardUid::Double(_) => Self::MifareClassic4k,
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MifareClassic1k => write!(f, "Mifare Classic 1K"),
            Self::MifareClassic4k => write!(f, "Mifare Classic 4K"),
        }
    }
}
