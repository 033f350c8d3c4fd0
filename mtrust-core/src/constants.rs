//! Protocol constants
//!
//! The command/status byte values and the frame layout were inferred from
//! reader behavior and have not been verified against vendor documentation.
//! Keep anything wire-level in this crate so it can be corrected in one
//! place without touching the session layer.

use std::time::Duration;

/// USB vendor ID of the MT3-URF1-R333 reader
pub const VENDOR_ID: u16 = 0x23A4;

/// USB product ID of the MT3-URF1-R333 reader
pub const PRODUCT_ID: u16 = 0x020C;

/// Interrupt IN endpoint address
pub const ENDPOINT_IN: u8 = 0x81;

/// Interrupt OUT endpoint address
pub const ENDPOINT_OUT: u8 = 0x01;

/// Frame header sentinel byte
pub const FRAME_HEADER: u8 = 0xAA;

/// Maximum payload bytes per frame (64 - header - cmd - len - checksum)
pub const MAX_PAYLOAD: usize = 60;

/// Bounded write timeout for the OUT endpoint
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Per-read timeout inside the background read loop
pub const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Backoff after a failed physical read, to avoid busy-spinning on a
/// disconnected device
pub const READ_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Default per-operation response timeout
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(3);

/// Default auto-poll period
pub const AUTO_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Mifare Classic (M1) card constants
pub mod m1 {
    /// Single-size UID length (Mifare Classic 1K)
    pub const UID_LENGTH_4: usize = 4;

    /// Double-size UID length (Mifare Classic 4K)
    pub const UID_LENGTH_7: usize = 7;

    /// Data block size in bytes
    pub const BLOCK_SIZE: usize = 16;

    /// Blocks per sector
    pub const SECTOR_SIZE: usize = 4;

    /// Number of addressable sectors
    pub const SECTOR_COUNT: u8 = 16;

    /// Sector key length in bytes
    pub const KEY_LENGTH: usize = 6;

    /// Factory default key A
    pub const DEFAULT_KEY_A: [u8; KEY_LENGTH] = [0xFF; KEY_LENGTH];

    /// Factory default key B
    pub const DEFAULT_KEY_B: [u8; KEY_LENGTH] = [0xFF; KEY_LENGTH];
}
