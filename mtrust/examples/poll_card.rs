//! Poll for a card, authenticate sector 1 with the default key and dump
//! block 4.

use mtrust::transport::{HidTransport, TransportConfig, UsbHid};
use mtrust::{CardSession, KeyType, ReaderEvent, SessionConfig};
use mtrust_core::constants::{AUTO_POLL_INTERVAL, PRODUCT_ID, VENDOR_ID, m1};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!(
        "Looking for reader (VID 0x{VENDOR_ID:04X}, PID 0x{PRODUCT_ID:04X})..."
    );

    let handle = rusb::open_device_with_vid_pid(VENDOR_ID, PRODUCT_ID)
        .ok_or("reader not found - check the USB connection")?;

    let dev = UsbHid::open(handle)?;
    let transport = HidTransport::open(dev, TransportConfig::default());
    let (session, mut events) = CardSession::new(transport, SessionConfig::default());

    println!("✓ Reader open, waiting for a card...");
    let poller = session.start_auto_poll(AUTO_POLL_INTERVAL);

    while let Some(event) = events.recv().await {
        match event {
            ReaderEvent::CardDetected { uid, card_type } => {
                println!("✓ Card {uid} ({card_type})");

                match session
                    .auth_sector(1, KeyType::KeyA, &m1::DEFAULT_KEY_A)
                    .await
                {
                    Ok(()) => {
                        let data = session.read_block(4).await?;
                        println!("✓ Block 4: {}", hex::encode(data));
                    }
                    Err(e) => println!("✗ Auth failed: {e}"),
                }
                break;
            }
            ReaderEvent::DeviceDetached => {
                println!("✗ Reader detached");
                break;
            }
            other => println!("  {other:?}"),
        }
    }

    poller.stop().await;
    session.close().await;
    println!("✓ Done");

    Ok(())
}
