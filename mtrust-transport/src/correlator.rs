//! Request/response correlation
//!
//! The wire protocol carries no sequence or request identifier, so at most
//! one exchange is in flight at a time and whatever frame arrives next
//! belongs to whoever is waiting. The correlator is the only state shared
//! between the read loop and operation callers: a single pending-response
//! slot behind one lock, with a wakeup handoff to the blocked waiter.

use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::trace;

use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct Slot {
    frame: Option<Bytes>,
    closed: bool,
}

/// Single-slot handoff between the read loop and a blocked caller
#[derive(Debug, Default)]
pub struct Correlator {
    slot: Mutex<Slot>,
    notify: Notify,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the slot for a new exchange, dropping any stale frame.
    ///
    /// Called at send time, before the command goes out, so a fast response
    /// cannot race the waiter.
    pub fn arm(&self) {
        let mut slot = self.slot.lock();
        if slot.frame.take().is_some() {
            trace!("Dropped stale response frame");
        }
    }

    /// Deposit an inbound frame and wake the waiter.
    ///
    /// Callable from the blocking read loop.
    pub fn deposit(&self, frame: Bytes) {
        {
            let mut slot = self.slot.lock();
            slot.frame = Some(frame);
        }
        self.notify.notify_one();
    }

    /// Unblock any waiter with a closing outcome; permanent.
    pub fn close(&self) {
        {
            let mut slot = self.slot.lock();
            slot.closed = true;
        }
        self.notify.notify_one();
    }

    /// Block until a frame is deposited or the timeout elapses.
    ///
    /// # Errors
    ///
    /// [`Error::ResponseTimeout`] when the deadline passes without a frame,
    /// [`Error::Closing`] once the correlator is closed.
    pub async fn wait(&self, timeout: Duration) -> Result<Bytes> {
        let deadline = Instant::now() + timeout;

        loop {
            {
                let mut slot = self.slot.lock();
                if let Some(frame) = slot.frame.take() {
                    return Ok(frame);
                }
                if slot.closed {
                    return Err(Error::Closing);
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::ResponseTimeout(timeout));
            }

            // A deposit between the slot check and this await leaves a
            // stored permit, so the wakeup cannot be missed.
            let _ = tokio::time::timeout_at(deadline, self.notify.notified()).await;
        }
    }
}
