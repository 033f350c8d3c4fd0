//! MT3 frame checksum
//!
//! The checksum is a single byte: XOR over every byte that precedes it in
//! the frame (header sentinel, command/status, length and payload). Any
//! single-bit corruption of those bytes is detected, none is correctable.

/// Calculate the XOR checksum over `bytes`
pub fn calculate(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc ^ b)
}

/// Verify that `expected` matches the checksum of `bytes`
pub fn verify(bytes: &[u8], expected: u8) -> bool {
    calculate(bytes) == expected
}
