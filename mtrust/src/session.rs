//! Card session: poll / authenticate / read, with card-loss recovery
//!
//! One session owns one open transport. Operations are serialized by an
//! internal mutex because the wire protocol cannot correlate overlapping
//! exchanges; state transitions therefore never race. Every operation
//! converts lower-layer faults into a typed error plus an emitted event,
//! and no failure leaves the session unusable.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use mtrust_core::constants::m1;
use mtrust_core::{CardUid, KeyType, Response, Status, decode_response, frame};
use mtrust_transport::HidTransport;
use mtrust_types::{CardType, ErrorCode, ReaderEvent};

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::state::CardState;

struct Inner {
    transport: HidTransport,
    state: Mutex<CardState>,
    events: mpsc::Sender<ReaderEvent>,
    // Serializes exchanges: the protocol allows one in flight at a time.
    op: tokio::sync::Mutex<()>,
    config: SessionConfig,
}

/// Session over one opened reader
///
/// Cheap to clone; clones share the same transport and state.
#[derive(Clone)]
pub struct CardSession {
    inner: Arc<Inner>,
}

impl CardSession {
    /// Create a session over an open transport.
    ///
    /// Returns the session and the receiving end of its event channel.
    /// Emits [`ReaderEvent::DeviceReady`] immediately and
    /// [`ReaderEvent::DeviceDetached`] when the transport's read loop
    /// exits.
    pub fn new(transport: HidTransport, config: SessionConfig) -> (Self, mpsc::Receiver<ReaderEvent>) {
        let (tx, rx) = mpsc::channel(config.event_capacity);

        {
            let tx = tx.clone();
            transport.on_disconnect(move || {
                if tx.try_send(ReaderEvent::DeviceDetached).is_err() {
                    warn!("Event channel unavailable, dropping DeviceDetached");
                }
            });
        }

        let session = Self {
            inner: Arc::new(Inner {
                transport,
                state: Mutex::new(CardState::NoCard),
                events: tx,
                op: tokio::sync::Mutex::new(()),
                config,
            }),
        };

        session.emit(ReaderEvent::DeviceReady);

        (session, rx)
    }

    /// Current session state
    pub fn state(&self) -> CardState {
        *self.inner.state.lock()
    }

    /// UID of the currently detected card, if any
    pub fn current_uid(&self) -> Option<CardUid> {
        self.state().uid()
    }

    /// Forget the currently detected card
    pub fn clear_card(&self) {
        debug!("Card state cleared");
        self.set_state(CardState::NoCard);
    }

    /// Poll for a card in the field.
    ///
    /// A response timeout means no card (expected, not an error) and no
    /// event is emitted for it. On detection the state moves to
    /// [`CardState::Present`] and [`ReaderEvent::CardDetected`] is emitted.
    pub async fn poll_card(&self) -> Result<Option<CardUid>> {
        self.poll_inner(true).await
    }

    async fn poll_inner(&self, emit_detected: bool) -> Result<Option<CardUid>> {
        let _guard = self.inner.op.lock().await;

        let response = match self
            .request(&frame::poll_card())
            .await
        {
            Ok(response) => response,
            Err(Error::Transport(mtrust_transport::Error::ResponseTimeout(_))) => {
                trace!("Poll timed out - no card in field");
                self.set_state(CardState::NoCard);
                return Ok(None);
            }
            Err(e) => {
                self.emit_error(ErrorCode::PollFailed, format!("Poll failed: {e}"));
                return Err(e);
            }
        };

        let decoded = match decode_response(&response) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.emit_error(ErrorCode::PollFailed, format!("Bad poll response: {e}"));
                return Err(e.into());
            }
        };

        match decoded.status {
            Status::Success if decoded.payload.is_empty() => {
                trace!("No card detected");
                self.set_state(CardState::NoCard);
                Ok(None)
            }
            Status::Success => {
                let uid = match CardUid::from_poll_payload(&decoded.payload) {
                    Ok(uid) => uid,
                    Err(e) => {
                        self.emit_error(ErrorCode::InvalidData, format!("{e}"));
                        return Err(e.into());
                    }
                };

                let card_type = CardType::from_uid(&uid);
                debug!(%uid, %card_type, "Card detected");

                self.set_state(CardState::Present { uid });
                if emit_detected {
                    self.emit(ReaderEvent::CardDetected { uid, card_type });
                }
                Ok(Some(uid))
            }
            Status::NoCard => {
                trace!("No card detected");
                self.set_state(CardState::NoCard);
                Ok(None)
            }
            other => {
                self.emit_error(ErrorCode::PollFailed, format!("Poll failed: {other}"));
                Err(Error::UnexpectedStatus(other))
            }
        }
    }

    /// Authenticate a sector with the given key.
    ///
    /// Requires a detected card; fails with [`Error::NoCard`] without
    /// touching the transport otherwise.
    pub async fn auth_sector(
        &self,
        sector: u8,
        key_type: KeyType,
        key: &[u8; m1::KEY_LENGTH],
    ) -> Result<()> {
        let _guard = self.inner.op.lock().await;

        let Some(uid) = self.state().uid() else {
            self.emit(ReaderEvent::AuthResult {
                success: false,
                message: "No card detected".into(),
            });
            return Err(Error::NoCard);
        };

        debug!(sector, %key_type, "Authenticating sector");

        let request = frame::auth_sector(sector, key_type, key)?;
        let response = match self.request(&request).await {
            Ok(response) => response,
            Err(e) => {
                self.emit(ReaderEvent::AuthResult {
                    success: false,
                    message: format!("{e}"),
                });
                return Err(e);
            }
        };

        let decoded = match decode_response(&response) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.emit(ReaderEvent::AuthResult {
                    success: false,
                    message: format!("Bad auth response: {e}"),
                });
                return Err(e.into());
            }
        };

        match decoded.status {
            Status::Success => {
                debug!(sector, "Sector authenticated");
                self.set_state(CardState::Authenticated {
                    uid,
                    sector,
                    key_type,
                });
                self.emit(ReaderEvent::AuthResult {
                    success: true,
                    message: format!("Sector {sector} authenticated"),
                });
                Ok(())
            }
            Status::AuthFailed => {
                // Authentication for the sector is revoked, card stays.
                self.set_state(CardState::Present { uid });
                self.emit(ReaderEvent::AuthResult {
                    success: false,
                    message: "Wrong key".into(),
                });
                Err(Error::AuthFailed)
            }
            Status::NoCard => {
                self.set_state(CardState::NoCard);
                self.emit(ReaderEvent::AuthResult {
                    success: false,
                    message: "Card lost".into(),
                });
                Err(Error::CardLost)
            }
            other => {
                self.emit(ReaderEvent::AuthResult {
                    success: false,
                    message: format!("Authentication failed ({other})"),
                });
                Err(Error::UnexpectedStatus(other))
            }
        }
    }

    /// Read one 16-byte data block.
    ///
    /// The sector containing the block must already be authenticated; the
    /// reader enforces this and answers READ_FAILED otherwise. Requires a
    /// detected card.
    pub async fn read_block(&self, block: u8) -> Result<[u8; m1::BLOCK_SIZE]> {
        let _guard = self.inner.op.lock().await;

        if !self.state().has_card() {
            self.emit_error(ErrorCode::NoCard, "No card detected".into());
            return Err(Error::NoCard);
        }

        debug!(block, "Reading block");

        let response = match self.request(&frame::read_block(block)).await {
            Ok(response) => response,
            Err(e @ Error::Transport(mtrust_transport::Error::ResponseTimeout(_))) => {
                self.emit_error(ErrorCode::Timeout, "Read timed out".into());
                return Err(e);
            }
            Err(e) => {
                self.emit_error(ErrorCode::SendFailed, format!("{e}"));
                return Err(e);
            }
        };

        let decoded = match decode_response(&response) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.emit_error(ErrorCode::InvalidData, format!("Bad read response: {e}"));
                return Err(e.into());
            }
        };

        match decoded.status {
            Status::Success => {
                if decoded.payload.len() != m1::BLOCK_SIZE {
                    self.emit_error(
                        ErrorCode::InvalidData,
                        format!(
                            "Expected {} block bytes, got {}",
                            m1::BLOCK_SIZE,
                            decoded.payload.len()
                        ),
                    );
                    return Err(Error::DataIntegrity {
                        expected: m1::BLOCK_SIZE,
                        actual: decoded.payload.len(),
                    });
                }

                let mut data = [0u8; m1::BLOCK_SIZE];
                data.copy_from_slice(&decoded.payload);

                debug!(block, "Block read");
                self.emit(ReaderEvent::BlockRead { data });
                Ok(data)
            }
            Status::ReadFailed => {
                self.emit_error(
                    ErrorCode::ReadFailed,
                    "Read failed - authenticate the sector first".into(),
                );
                Err(Error::ReadFailed)
            }
            Status::NoCard => {
                self.set_state(CardState::NoCard);
                self.emit_error(ErrorCode::NoCard, "Card lost".into());
                Err(Error::CardLost)
            }
            other => {
                self.emit_error(ErrorCode::ReadFailed, format!("Read failed ({other})"));
                Err(Error::UnexpectedStatus(other))
            }
        }
    }

    /// Halt the selected card and forget it.
    pub async fn halt(&self) -> Result<()> {
        let _guard = self.inner.op.lock().await;

        let response = self.request(&frame::halt_card()).await?;
        let decoded = decode_response(&response)?;

        match decoded.status {
            Status::Success | Status::NoCard => {
                debug!("Card halted");
                self.set_state(CardState::NoCard);
                Ok(())
            }
            other => Err(Error::UnexpectedStatus(other)),
        }
    }

    /// Query the reader's own status; returns the raw status payload.
    pub async fn reader_status(&self) -> Result<Bytes> {
        let _guard = self.inner.op.lock().await;

        let response = self.request(&frame::get_status()).await?;
        let Response { status, payload } = decode_response(&response)?;

        if status.is_success() {
            Ok(payload)
        } else {
            Err(Error::UnexpectedStatus(status))
        }
    }

    /// Run [`poll_card`](Self::poll_card) on a fixed period until stopped.
    ///
    /// Emits [`ReaderEvent::CardDetected`] only when the UID changes from
    /// none (or another card) to a new value, and
    /// [`ReaderEvent::CardRemoved`] only on the transition from some card
    /// to none; identical consecutive polls produce no duplicate events.
    pub fn start_auto_poll(&self, interval: Duration) -> AutoPoll {
        let session = self.clone();
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            debug!(?interval, "Auto-poll started");
            let mut last_uid: Option<CardUid> = None;

            loop {
                match session.poll_inner(false).await {
                    Ok(Some(uid)) => {
                        if last_uid != Some(uid) {
                            debug!(%uid, "Card appeared");
                            session.emit(ReaderEvent::CardDetected {
                                uid,
                                card_type: CardType::from_uid(&uid),
                            });
                            last_uid = Some(uid);
                        }
                    }
                    Ok(None) => {
                        if last_uid.take().is_some() {
                            debug!("Card removed");
                            session.emit(ReaderEvent::CardRemoved);
                        }
                    }
                    Err(e) => {
                        // Single tick failure; the next tick retries.
                        trace!("Auto-poll tick failed: {e}");
                    }
                }

                // The stop signal only interrupts the pause, never an
                // in-flight exchange.
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            debug!("Auto-poll stopped");
        });

        AutoPoll {
            stop: stop_tx,
            task,
        }
    }

    /// Close the owning transport and reset state.
    ///
    /// Ends the session: any blocked operation is unblocked with a closing
    /// outcome and the read loop exits.
    pub async fn close(&self) {
        self.inner.transport.close().await;
        self.set_state(CardState::NoCard);
        debug!("Session closed");
    }

    async fn request(&self, request: &mtrust_core::RawFrame) -> Result<Bytes> {
        Ok(self
            .inner
            .transport
            .request(request, self.inner.config.response_timeout)
            .await?)
    }

    fn set_state(&self, next: CardState) {
        let mut state = self.inner.state.lock();
        if *state != next {
            trace!(from = ?*state, to = ?next, "State transition");
            *state = next;
        }
    }

    fn emit(&self, event: ReaderEvent) {
        if let Err(mpsc::error::TrySendError::Full(event)) = self.inner.events.try_send(event) {
            warn!("Event channel full, dropping {event:?}");
        }
    }

    fn emit_error(&self, code: ErrorCode, message: String) {
        warn!(code = %code, "{message}");
        self.emit(ReaderEvent::Error { code, message });
    }
}

/// Handle for a running auto-poll loop
pub struct AutoPoll {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl AutoPoll {
    /// Stop polling after the current tick completes.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}
