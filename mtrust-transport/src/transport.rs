//! HID transport with a background read loop

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use mtrust_core::{FRAME_SIZE, RawFrame, constants};

use crate::correlator::Correlator;
use crate::error::{Error, Result};
use crate::hid::RawHid;

/// Transport tuning knobs
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Bounded OUT-endpoint write timeout
    pub write_timeout: Duration,

    /// Per-read timeout inside the read loop
    pub read_timeout: Duration,

    /// Backoff after a failed physical read
    pub error_backoff: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            write_timeout: constants::WRITE_TIMEOUT,
            read_timeout: constants::READ_TIMEOUT,
            error_backoff: constants::READ_ERROR_BACKOFF,
        }
    }
}

impl TransportConfig {
    /// Set the write timeout
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the read-loop per-read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the backoff applied after a failed read
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }
}

type DisconnectHook = Box<dyn Fn() + Send + Sync>;

struct Shared {
    dev: Arc<dyn RawHid>,
    alive: AtomicBool,
    correlator: Correlator,
    config: TransportConfig,
    on_disconnect: Mutex<Option<DisconnectHook>>,
}

/// Transport owning one opened HID device and its read loop
///
/// The read loop is the sole reader of the IN endpoint. Callers never touch
/// the physical transport directly: sends go through the blocking pool with
/// a bounded timeout, and responses are awaited on the [`Correlator`].
pub struct HidTransport {
    shared: Arc<Shared>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl HidTransport {
    /// Take ownership of a claimed device and start the read loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(dev: impl RawHid, config: TransportConfig) -> Self {
        let shared = Arc::new(Shared {
            dev: Arc::new(dev),
            alive: AtomicBool::new(true),
            correlator: Correlator::new(),
            config,
            on_disconnect: Mutex::new(None),
        });

        let reader = {
            let shared = shared.clone();
            tokio::task::spawn_blocking(move || read_loop(shared))
        };

        debug!("Transport open, read loop running");

        Self {
            shared,
            reader: Mutex::new(Some(reader)),
        }
    }

    /// Register a hook fired once when the read loop exits
    pub fn on_disconnect(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.shared.on_disconnect.lock() = Some(Box::new(hook));
    }

    /// Check whether the transport is open
    pub fn is_open(&self) -> bool {
        self.shared.alive.load(Ordering::Acquire)
    }

    /// Check whether the device accepts commands (OUT endpoint present)
    pub fn writable(&self) -> bool {
        self.shared.dev.writable()
    }

    /// Write one frame to the OUT endpoint.
    ///
    /// # Errors
    ///
    /// Fails immediately when the transport is closed or the device has no
    /// OUT endpoint; otherwise propagates the bounded write's outcome.
    pub async fn send(&self, frame: &RawFrame) -> Result<()> {
        if !self.is_open() {
            return Err(Error::Closed);
        }
        if !self.shared.dev.writable() {
            return Err(Error::NoOutEndpoint);
        }

        trace!(data = hex::encode(&frame[..8]), "Sending frame");

        let dev = self.shared.dev.clone();
        let timeout = self.shared.config.write_timeout;
        let frame = *frame;

        let written = tokio::task::spawn_blocking(move || dev.write_packet(&frame, timeout))
            .await
            .map_err(|_| Error::TaskFailed)??;

        trace!(written, "Frame sent");
        Ok(())
    }

    /// Perform one command/response exchange.
    ///
    /// Arms the correlator before the write so a fast response cannot be
    /// lost, then waits up to `timeout` for the read loop to deliver the
    /// next inbound frame. Callers must serialize exchanges; the protocol
    /// cannot correlate overlapping requests.
    pub async fn request(&self, frame: &RawFrame, timeout: Duration) -> Result<Bytes> {
        self.shared.correlator.arm();
        self.send(frame).await?;
        self.shared.correlator.wait(timeout).await
    }

    /// Close the transport: stop the read loop and unblock any waiter.
    ///
    /// Idempotent. Returns once the loop has exited, which is bounded by
    /// the per-read timeout because the loop checks liveness each
    /// iteration.
    pub async fn close(&self) {
        if self.shared.alive.swap(false, Ordering::AcqRel) {
            debug!("Closing transport");
        }
        self.shared.correlator.close();

        let reader = self.reader.lock().take();
        if let Some(reader) = reader {
            if reader.await.is_err() {
                warn!("Read loop task failed during close");
            }
        }
    }
}

fn read_loop(shared: Arc<Shared>) {
    debug!("Read loop started");
    let mut buf = [0u8; FRAME_SIZE];

    while shared.alive.load(Ordering::Acquire) {
        match shared.dev.read_packet(&mut buf, shared.config.read_timeout) {
            Ok(0) | Err(Error::ReadTimeout) => continue,
            Ok(n) => {
                let packet = &buf[..n];
                // All-zero packets are idle noise from the reader.
                if packet.iter().all(|&b| b == 0) {
                    trace!("Discarding idle packet");
                    continue;
                }
                trace!(len = n, data = hex::encode(packet), "Inbound packet");
                shared.correlator.deposit(Bytes::copy_from_slice(packet));
            }
            Err(e) => {
                if !shared.alive.load(Ordering::Acquire) {
                    break;
                }
                warn!("Read failed: {e}");
                std::thread::sleep(shared.config.error_backoff);
            }
        }
    }

    debug!("Read loop exited");

    let hook = shared.on_disconnect.lock().take();
    if let Some(hook) = hook {
        hook();
    }
}
