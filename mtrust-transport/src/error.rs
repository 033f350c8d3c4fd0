//! Transport errors

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The device exposes no HID-class interface
    #[error("No HID interface on device")]
    NoHidInterface,

    /// The HID interface has no IN endpoint; the transport cannot operate
    #[error("No IN endpoint on HID interface")]
    NoInEndpoint,

    /// Send attempted on a passive (read-only) transport
    #[error("No OUT endpoint - device is in passive mode")]
    NoOutEndpoint,

    /// Transport has been closed
    #[error("Transport closed")]
    Closed,

    /// A waiter was unblocked because the transport is closing
    #[error("Transport closing while waiting for response")]
    Closing,

    /// One physical read timed out (normal tick of the read loop)
    #[error("Read timed out")]
    ReadTimeout,

    /// No response arrived within the per-operation deadline
    #[error("No response within {0:?}")]
    ResponseTimeout(std::time::Duration),

    /// A blocking-pool task was cancelled or panicked
    #[error("Background task failed")]
    TaskFailed,

    /// USB error from the underlying device
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),
}
