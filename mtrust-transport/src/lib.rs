//! USB HID transport layer for Mingtech MT3 readers
//!
//! One [`HidTransport`] exclusively owns one opened device for its
//! lifetime. It runs a background read loop that is the sole reader of the
//! IN endpoint; inbound frames are handed to a single-slot [`Correlator`]
//! that wakes whichever operation is waiting for a response.
//!
//! The physical device sits behind the [`RawHid`] seam so the loop and the
//! correlator can be exercised without hardware; [`UsbHid`] is the
//! `rusb`-backed implementation.

pub mod correlator;
pub mod error;
pub mod hid;
pub mod transport;

pub use correlator::Correlator;
pub use error::{Error, Result};
pub use hid::{RawHid, UsbHid};
pub use transport::{HidTransport, TransportConfig};
