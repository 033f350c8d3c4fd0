//! # mtrust-core
//!
//! Core protocol implementation for Mingtech MT3 series card readers.
//!
//! This crate provides the low-level protocol primitives:
//! - Frame structure and encoding/decoding
//! - XOR checksum calculation
//! - Command and status code definitions
//! - Card UID extraction
//! - Protocol constants

pub mod checksum;
pub mod command;
pub mod constants;
pub mod error;
pub mod frame;
pub mod status;
pub mod uid;

pub use command::Command;
pub use error::{Error, Result};
pub use frame::{Response, decode_response, encode_command, encode_response};
pub use status::Status;
pub use uid::{CardUid, KeyType};

/// Protocol version information
pub const PROTOCOL_VERSION: &str = "1.0";

/// Fixed HID packet size in bytes
pub const FRAME_SIZE: usize = 64;

/// A complete, zero-padded wire frame
pub type RawFrame = [u8; FRAME_SIZE];
