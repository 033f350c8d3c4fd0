//! MT3 frame encoding/decoding
//!
//! # Frame Structure
//!
//! ```text
//! ┌──────────┬──────────────┬──────────┬──────────────┬──────────┬─────────┐
//! │  Header  │  Cmd/Status  │  Length  │   Payload    │ Checksum │ Padding │
//! │  1 byte  │    1 byte    │  1 byte  │  0-60 bytes  │  1 byte  │ to 64 B │
//! │  (0xAA)  │              │          │              │  (XOR)   │ (0x00)  │
//! └──────────┴──────────────┴──────────┴──────────────┴──────────┴─────────┘
//! ```
//!
//! The checksum is the XOR of every preceding byte. Outbound frames carry a
//! command code in byte 1, inbound frames a status code. Frames are always
//! padded with zeros to the fixed 64-byte HID packet size.

use bytes::Bytes;
use tracing::trace;

use crate::checksum;
use crate::command::Command;
use crate::constants::{FRAME_HEADER, MAX_PAYLOAD, m1};
use crate::error::{Error, Result};
use crate::status::Status;
use crate::uid::KeyType;
use crate::{FRAME_SIZE, RawFrame};

/// Frame header size: sentinel + command/status + length
const HEADER_SIZE: usize = 3;

/// Minimum decodable frame: header plus checksum
const MIN_FRAME: usize = HEADER_SIZE + 1;

/// A decoded response frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status byte reported by the reader
    pub status: Status,

    /// Response payload (may be empty)
    pub payload: Bytes,
}

/// Encode a command frame, zero-padded to 64 bytes
///
/// # Errors
///
/// Fails if `payload` exceeds 60 bytes.
pub fn encode_command(cmd: Command, payload: &[u8]) -> Result<RawFrame> {
    encode(u8::from(cmd), payload)
}

/// Encode a response frame, zero-padded to 64 bytes
///
/// The reader is the only party that sends responses on the wire; this
/// encoder exists for tests and reader simulators.
pub fn encode_response(status: Status, payload: &[u8]) -> Result<RawFrame> {
    encode(status.as_byte(), payload)
}

fn encode(code: u8, payload: &[u8]) -> Result<RawFrame> {
    if payload.len() > MAX_PAYLOAD {
        return Err(Error::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }

    let mut frame = [0u8; FRAME_SIZE];
    frame[0] = FRAME_HEADER;
    frame[1] = code;
    frame[2] = payload.len() as u8;
    frame[HEADER_SIZE..HEADER_SIZE + payload.len()].copy_from_slice(payload);

    let cs_at = HEADER_SIZE + payload.len();
    frame[cs_at] = checksum::calculate(&frame[..cs_at]);

    trace!(code = format!("0x{code:02X}"), len = payload.len(), "Encoded frame");

    Ok(frame)
}

/// Decode a response frame
///
/// Accepts any buffer of at least 4 bytes; trailing padding past the
/// checksum is ignored.
///
/// # Errors
///
/// Returns an error if the buffer is shorter than 4 bytes, the header
/// sentinel is missing, the declared payload length overruns the buffer,
/// or the checksum does not match.
pub fn decode_response(frame: &[u8]) -> Result<Response> {
    if frame.len() < MIN_FRAME {
        return Err(Error::FrameTooShort {
            expected: MIN_FRAME,
            actual: frame.len(),
        });
    }

    if frame[0] != FRAME_HEADER {
        return Err(Error::BadHeader(frame[0]));
    }

    let len = frame[2] as usize;
    if frame.len() < HEADER_SIZE + len + 1 {
        return Err(Error::LengthOverrun {
            declared: len,
            available: frame.len(),
        });
    }

    let cs_at = HEADER_SIZE + len;
    let expected = checksum::calculate(&frame[..cs_at]);
    let received = frame[cs_at];
    if expected != received {
        return Err(Error::ChecksumMismatch { expected, received });
    }

    let status = Status::from_byte(frame[1]);
    let payload = Bytes::copy_from_slice(&frame[HEADER_SIZE..cs_at]);

    trace!(
        status = %status,
        payload = hex::encode(&payload),
        "Decoded frame"
    );

    Ok(Response { status, payload })
}

/// Build a POLL_CARD frame (no payload)
pub fn poll_card() -> RawFrame {
    // A frame with no payload always fits.
    match encode_command(Command::PollCard, &[]) {
        Ok(frame) => frame,
        Err(_) => unreachable!(),
    }
}

/// Build a GET_STATUS frame (no payload)
pub fn get_status() -> RawFrame {
    match encode_command(Command::GetStatus, &[]) {
        Ok(frame) => frame,
        Err(_) => unreachable!(),
    }
}

/// Build a HALT_CARD frame (no payload)
pub fn halt_card() -> RawFrame {
    match encode_command(Command::HaltCard, &[]) {
        Ok(frame) => frame,
        Err(_) => unreachable!(),
    }
}

/// Build an AUTH_SECTOR frame
///
/// Payload layout: `[sector][key type byte][6-byte key]`.
///
/// # Errors
///
/// Fails if `sector` is outside 0-15. The key length is fixed by the type.
pub fn auth_sector(sector: u8, key_type: KeyType, key: &[u8; m1::KEY_LENGTH]) -> Result<RawFrame> {
    if sector >= m1::SECTOR_COUNT {
        return Err(Error::InvalidSector(sector));
    }

    let mut payload = [0u8; 2 + m1::KEY_LENGTH];
    payload[0] = sector;
    payload[1] = key_type.wire_byte();
    payload[2..].copy_from_slice(key);

    encode_command(Command::AuthSector, &payload)
}

/// Build a READ_BLOCK frame
///
/// The block index is a single byte on the wire (0-63 for 1K cards,
/// 0-255 for 4K).
pub fn read_block(block: u8) -> RawFrame {
    match encode_command(Command::ReadBlock, &[block]) {
        Ok(frame) => frame,
        Err(_) => unreachable!(),
    }
}
