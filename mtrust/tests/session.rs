//! Card session behavior against a scripted fake reader.
//!
//! The fake implements the transport's raw-device seam: every frame the
//! session writes consumes one script step, which either produces a
//! response packet for the read loop or swallows the command so the
//! operation times out.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use mtrust::transport::{Error as TransportError, HidTransport, RawHid, TransportConfig};
use mtrust::{
    CardSession, CardState, CardType, Error, ErrorCode, KeyType, ReaderEvent, SessionConfig, Status,
};
use mtrust_core::{CardUid, frame};

const UID_A: [u8; 4] = [0x04, 0xA3, 0x7F, 0x1C];
const UID_B: [u8; 4] = [0x11, 0x22, 0x33, 0x44];

/// One scripted reaction to a written command frame
enum Step {
    /// Respond with an encoded `[status][payload]` frame
    Reply(Status, Vec<u8>),
    /// Swallow the command; the operation runs into its timeout
    Ignore,
}

struct FakeReader {
    script: Mutex<VecDeque<Step>>,
    inbox: Mutex<VecDeque<Vec<u8>>>,
    available: Condvar,
    sent: Mutex<Vec<Vec<u8>>>,
    writes: AtomicUsize,
}

impl FakeReader {
    fn new(script: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            inbox: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            sent: Mutex::new(Vec::new()),
            writes: AtomicUsize::new(0),
        })
    }

    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

/// Newtype over the shared fake so the foreign `RawHid` trait can be
/// implemented without tripping the orphan rule on `Arc<FakeReader>`.
struct FakeDev(Arc<FakeReader>);

impl RawHid for FakeDev {
    fn read_packet(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransportError> {
        let guard = self.0.inbox.lock().unwrap();
        let (mut guard, result) = self
            .0
            .available
            .wait_timeout_while(guard, timeout, |inbox| inbox.is_empty())
            .unwrap();

        if result.timed_out() && guard.is_empty() {
            return Err(TransportError::ReadTimeout);
        }

        let packet = guard.pop_front().unwrap();
        buf[..packet.len()].copy_from_slice(&packet);
        Ok(packet.len())
    }

    fn write_packet(&self, data: &[u8], _timeout: Duration) -> Result<usize, TransportError> {
        self.0.sent.lock().unwrap().push(data.to_vec());
        self.0.writes.fetch_add(1, Ordering::SeqCst);

        if let Some(Step::Reply(status, payload)) = self.0.script.lock().unwrap().pop_front() {
            let response = frame::encode_response(status, &payload).unwrap();
            self.0.inbox.lock().unwrap().push_back(response.to_vec());
            self.0.available.notify_all();
        }

        Ok(data.len())
    }

    fn writable(&self) -> bool {
        true
    }
}

async fn session_with_script(
    script: Vec<Step>,
) -> (CardSession, mpsc::Receiver<ReaderEvent>, Arc<FakeReader>) {
    let dev = FakeReader::new(script);
    let transport = HidTransport::open(
        FakeDev(dev.clone()),
        TransportConfig::default()
            .with_read_timeout(Duration::from_millis(20))
            .with_error_backoff(Duration::from_millis(1)),
    );
    let (session, mut events) = CardSession::new(
        transport,
        SessionConfig::default().with_response_timeout(Duration::from_millis(150)),
    );

    let ready = next_event(&mut events).await;
    assert!(matches!(ready, ReaderEvent::DeviceReady));

    (session, events, dev)
}

async fn next_event(events: &mut mpsc::Receiver<ReaderEvent>) -> ReaderEvent {
    tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("no event within deadline")
        .expect("event channel closed")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn poll_detects_card_and_emits_event() {
    let (session, mut events, dev) =
        session_with_script(vec![Step::Reply(Status::Success, UID_A.to_vec())]).await;

    let uid = session.poll_card().await.unwrap().unwrap();
    assert_eq!(uid, CardUid::Single(UID_A));
    assert_eq!(session.state(), CardState::Present { uid });

    assert_eq!(
        next_event(&mut events).await,
        ReaderEvent::CardDetected {
            uid,
            card_type: CardType::MifareClassic1k,
        }
    );

    // The exact POLL_CARD frame went out on the wire
    assert_eq!(dev.sent.lock().unwrap()[0], frame::poll_card().to_vec());

    session.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn poll_seven_byte_uid_classified_as_4k() {
    let payload = vec![0x04, 0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC];
    let (session, mut events, _dev) =
        session_with_script(vec![Step::Reply(Status::Success, payload)]).await;

    let uid = session.poll_card().await.unwrap().unwrap();
    assert_eq!(uid.len(), 7);

    assert!(matches!(
        next_event(&mut events).await,
        ReaderEvent::CardDetected {
            card_type: CardType::MifareClassic4k,
            ..
        }
    ));

    session.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn poll_timeout_means_no_card_and_no_error_event() {
    let (session, mut events, _dev) = session_with_script(vec![Step::Ignore]).await;

    let result = session.poll_card().await.unwrap();
    assert_eq!(result, None);
    assert_eq!(session.state(), CardState::NoCard);

    // Expected condition: nothing is reported
    assert!(events.try_recv().is_err());

    session.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn poll_no_card_status_clears_state() {
    let (session, _events, _dev) =
        session_with_script(vec![Step::Reply(Status::NoCard, vec![])]).await;

    assert_eq!(session.poll_card().await.unwrap(), None);
    assert_eq!(session.state(), CardState::NoCard);

    session.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn poll_success_with_empty_payload_is_no_card() {
    let (session, _events, _dev) =
        session_with_script(vec![Step::Reply(Status::Success, vec![])]).await;

    assert_eq!(session.poll_card().await.unwrap(), None);

    session.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn poll_malformed_uid_leaves_state_unchanged() {
    let (session, mut events, _dev) =
        session_with_script(vec![Step::Reply(Status::Success, vec![1, 2, 3])]).await;

    let result = session.poll_card().await;
    assert!(matches!(
        result,
        Err(Error::Core(mtrust_core::Error::MalformedUid(3)))
    ));
    assert_eq!(session.state(), CardState::NoCard);

    assert!(matches!(
        next_event(&mut events).await,
        ReaderEvent::Error {
            code: ErrorCode::InvalidData,
            ..
        }
    ));

    session.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn auth_without_card_sends_nothing() {
    let (session, mut events, dev) = session_with_script(vec![]).await;

    let result = session
        .auth_sector(1, KeyType::KeyA, &[0xFF; 6])
        .await;

    assert!(matches!(result, Err(Error::NoCard)));
    assert_eq!(dev.writes(), 0);

    assert_eq!(
        next_event(&mut events).await,
        ReaderEvent::AuthResult {
            success: false,
            message: "No card detected".into(),
        }
    );

    session.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn auth_success_transitions_to_authenticated() {
    let (session, mut events, dev) = session_with_script(vec![
        Step::Reply(Status::Success, UID_A.to_vec()),
        Step::Reply(Status::Success, vec![]),
    ])
    .await;

    let uid = session.poll_card().await.unwrap().unwrap();
    session
        .auth_sector(3, KeyType::KeyA, &[0xFF; 6])
        .await
        .unwrap();

    assert_eq!(
        session.state(),
        CardState::Authenticated {
            uid,
            sector: 3,
            key_type: KeyType::KeyA,
        }
    );

    // AUTH_SECTOR payload: [sector][key type][key]
    let sent = dev.sent.lock().unwrap();
    assert_eq!(
        &sent[1][..11],
        &[0xAA, 0x40, 0x08, 0x03, 0x60, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
    );
    drop(sent);

    let _detected = next_event(&mut events).await;
    assert_eq!(
        next_event(&mut events).await,
        ReaderEvent::AuthResult {
            success: true,
            message: "Sector 3 authenticated".into(),
        }
    );

    session.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn auth_wrong_key_drops_back_to_present() {
    let (session, _events, _dev) = session_with_script(vec![
        Step::Reply(Status::Success, UID_A.to_vec()),
        Step::Reply(Status::Success, vec![]),
        Step::Reply(Status::AuthFailed, vec![]),
    ])
    .await;

    let uid = session.poll_card().await.unwrap().unwrap();
    session
        .auth_sector(1, KeyType::KeyA, &[0xFF; 6])
        .await
        .unwrap();

    let result = session.auth_sector(2, KeyType::KeyB, &[0x00; 6]).await;
    assert!(matches!(result, Err(Error::AuthFailed)));
    assert_eq!(session.state(), CardState::Present { uid });

    session.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn auth_card_lost_resets_to_no_card() {
    let (session, _events, _dev) = session_with_script(vec![
        Step::Reply(Status::Success, UID_A.to_vec()),
        Step::Reply(Status::NoCard, vec![]),
    ])
    .await;

    session.poll_card().await.unwrap();

    let result = session.auth_sector(1, KeyType::KeyA, &[0xFF; 6]).await;
    assert!(matches!(result, Err(Error::CardLost)));
    assert_eq!(session.state(), CardState::NoCard);

    session.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn auth_timeout_is_a_failure_with_state_unchanged() {
    let (session, mut events, _dev) = session_with_script(vec![
        Step::Reply(Status::Success, UID_A.to_vec()),
        Step::Ignore,
    ])
    .await;

    let uid = session.poll_card().await.unwrap().unwrap();
    let _detected = next_event(&mut events).await;

    let result = session.auth_sector(1, KeyType::KeyA, &[0xFF; 6]).await;
    assert!(result.is_err());
    assert_eq!(session.state(), CardState::Present { uid });

    assert!(matches!(
        next_event(&mut events).await,
        ReaderEvent::AuthResult { success: false, .. }
    ));

    session.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn read_block_returns_sixteen_bytes() {
    let block: Vec<u8> = (0..16).collect();
    let (session, mut events, _dev) = session_with_script(vec![
        Step::Reply(Status::Success, UID_A.to_vec()),
        Step::Reply(Status::Success, vec![]),
        Step::Reply(Status::Success, block.clone()),
    ])
    .await;

    session.poll_card().await.unwrap();
    session
        .auth_sector(1, KeyType::KeyA, &[0xFF; 6])
        .await
        .unwrap();

    let data = session.read_block(4).await.unwrap();
    assert_eq!(&data[..], &block[..]);

    let _detected = next_event(&mut events).await;
    let _auth = next_event(&mut events).await;
    assert_eq!(
        next_event(&mut events).await,
        ReaderEvent::BlockRead { data }
    );

    session.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn read_block_wrong_payload_size_is_integrity_error() {
    let (session, mut events, _dev) = session_with_script(vec![
        Step::Reply(Status::Success, UID_A.to_vec()),
        Step::Reply(Status::Success, vec![0xAB; 8]),
    ])
    .await;

    session.poll_card().await.unwrap();
    let _detected = next_event(&mut events).await;

    let result = session.read_block(4).await;
    assert!(matches!(
        result,
        Err(Error::DataIntegrity {
            expected: 16,
            actual: 8
        })
    ));

    assert!(matches!(
        next_event(&mut events).await,
        ReaderEvent::Error {
            code: ErrorCode::InvalidData,
            ..
        }
    ));

    session.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn read_failed_points_at_missing_auth() {
    let (session, _events, _dev) = session_with_script(vec![
        Step::Reply(Status::Success, UID_A.to_vec()),
        Step::Reply(Status::ReadFailed, vec![]),
    ])
    .await;

    session.poll_card().await.unwrap();

    let result = session.read_block(4).await;
    assert!(matches!(result, Err(Error::ReadFailed)));

    session.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn card_lost_during_read_blocks_next_read_without_transport_call() {
    let (session, _events, dev) = session_with_script(vec![
        Step::Reply(Status::Success, UID_A.to_vec()),
        Step::Reply(Status::NoCard, vec![]),
    ])
    .await;

    session.poll_card().await.unwrap();

    let result = session.read_block(4).await;
    assert!(matches!(result, Err(Error::CardLost)));
    assert_eq!(session.state(), CardState::NoCard);

    let writes_before = dev.writes();
    let result = session.read_block(4).await;
    assert!(matches!(result, Err(Error::NoCard)));
    assert_eq!(dev.writes(), writes_before);

    session.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn auto_poll_emits_only_transitions() {
    // Tick sequence: none, A, A, none, B. Ticks past the scripted five
    // keep answering B so a late stop sees no further transitions.
    let mut script = vec![
        Step::Reply(Status::Success, vec![]),
        Step::Reply(Status::Success, UID_A.to_vec()),
        Step::Reply(Status::Success, UID_A.to_vec()),
        Step::Reply(Status::Success, vec![]),
        Step::Reply(Status::Success, UID_B.to_vec()),
    ];
    script.extend((0..50).map(|_| Step::Reply(Status::Success, UID_B.to_vec())));
    let (session, mut events, dev) = session_with_script(script).await;

    let poller = session.start_auto_poll(Duration::from_millis(10));

    // Wait until all five scripted ticks have gone out
    while dev.writes() < 5 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    poller.stop().await;

    let mut transitions = Vec::new();
    while let Ok(event) = events.try_recv() {
        transitions.push(event);
    }

    assert_eq!(
        transitions,
        vec![
            ReaderEvent::CardDetected {
                uid: CardUid::Single(UID_A),
                card_type: CardType::MifareClassic1k,
            },
            ReaderEvent::CardRemoved,
            ReaderEvent::CardDetected {
                uid: CardUid::Single(UID_B),
                card_type: CardType::MifareClassic1k,
            },
        ]
    );

    session.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn close_emits_device_detached() {
    let (session, mut events, _dev) = session_with_script(vec![]).await;

    session.close().await;

    assert_eq!(next_event(&mut events).await, ReaderEvent::DeviceDetached);
    assert_eq!(session.state(), CardState::NoCard);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn clear_card_forgets_the_uid() {
    let (session, _events, _dev) =
        session_with_script(vec![Step::Reply(Status::Success, UID_A.to_vec())]).await;

    session.poll_card().await.unwrap();
    assert!(session.current_uid().is_some());

    session.clear_card();
    assert_eq!(session.current_uid(), None);

    session.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn halt_clears_the_card_state() {
    let (session, _events, _dev) = session_with_script(vec![
        Step::Reply(Status::Success, UID_A.to_vec()),
        Step::Reply(Status::Success, vec![]),
    ])
    .await;

    session.poll_card().await.unwrap();
    session.halt().await.unwrap();
    assert_eq!(session.state(), CardState::NoCard);

    session.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reader_status_returns_raw_payload() {
    let (session, _events, _dev) =
        session_with_script(vec![Step::Reply(Status::Success, vec![0x01, 0x02])]).await;

    let payload = session.reader_status().await.unwrap();
    assert_eq!(payload.as_ref(), &[0x01, 0x02]);

    session.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn invalid_sector_is_rejected_before_sending() {
    let (session, _events, dev) =
        session_with_script(vec![Step::Reply(Status::Success, UID_A.to_vec())]).await;

    session.poll_card().await.unwrap();
    let writes_before = dev.writes();

    let result = session.auth_sector(16, KeyType::KeyA, &[0xFF; 6]).await;
    assert!(matches!(
        result,
        Err(Error::Core(mtrust_core::Error::InvalidSector(16)))
    ));
    assert_eq!(dev.writes(), writes_before);

    session.close().await;
}
