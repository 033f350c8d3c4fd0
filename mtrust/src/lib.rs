//! # mtrust
//!
//! Rust implementation of the Mingtech MT3 series USB HID card reader
//! protocol.
//!
//! ## Features
//!
//! - 64-byte framed wire protocol with XOR checksum validation
//! - Background read loop with request/response correlation under timeout
//! - Card session state machine: poll, sector auth, block read, auto-poll
//! - Structured reader events over a bounded channel
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use mtrust::{CardSession, SessionConfig};
//! use mtrust::transport::{HidTransport, TransportConfig, UsbHid};
//! use mtrust_core::constants::{PRODUCT_ID, VENDOR_ID};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Discovery and permissions are the host's responsibility; the
//!     // stack takes over from an opened handle.
//!     let handle = rusb::open_device_with_vid_pid(VENDOR_ID, PRODUCT_ID)
//!         .ok_or("reader not found")?;
//!
//!     let dev = UsbHid::open(handle)?;
//!     let transport = HidTransport::open(dev, TransportConfig::default());
//!     let (session, mut events) = CardSession::new(transport, SessionConfig::default());
//!
//!     let poller = session.start_auto_poll(Duration::from_millis(500));
//!     while let Some(event) = events.recv().await {
//!         println!("{event:?}");
//!     }
//!
//!     poller.stop().await;
//!     session.close().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod session;
pub mod state;

// Re-exports
pub use config::SessionConfig;
pub use error::{Error, Result};
pub use session::{AutoPoll, CardSession};
pub use state::CardState;

// Re-export the protocol and transport vocabulary
pub use mtrust_core::{CardUid, Command, KeyType, Status};
pub use mtrust_transport as transport;
pub use mtrust_types::{CardType, ErrorCode, ReaderEvent};
