//! Raw HID device access
//!
//! [`RawHid`] is the seam between the transport and the physical device.
//! [`UsbHid`] implements it on top of `rusb`: it resolves the HID
//! interface and endpoints from an already-opened, permission-granted
//! device handle (discovery and permission negotiation are the caller's
//! responsibility) and claims the interface for exclusive use.

use std::time::Duration;

use rusb::{DeviceHandle, Direction, GlobalContext, TransferType, constants::LIBUSB_CLASS_HID};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Blocking packet-level access to a claimed HID device.
///
/// Implementations must be callable from multiple threads: the read loop
/// owns the IN side while senders use the OUT side concurrently.
pub trait RawHid: Send + Sync + 'static {
    /// Read one packet from the IN endpoint, blocking up to `timeout`.
    ///
    /// Returns [`Error::ReadTimeout`] when no packet arrives in time.
    fn read_packet(&self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Write one packet to the OUT endpoint, blocking up to `timeout`.
    fn write_packet(&self, data: &[u8], timeout: Duration) -> Result<usize>;

    /// Whether an OUT endpoint exists. A device without one is restricted
    /// to passive (read-only) operation.
    fn writable(&self) -> bool;
}

#[derive(Debug, Copy, Clone)]
struct Endpoint {
    address: u8,
    transfer: TransferType,
}

/// rusb-backed HID device with a claimed interface
pub struct UsbHid {
    handle: DeviceHandle<GlobalContext>,
    interface: u8,
    ep_in: Endpoint,
    ep_out: Option<Endpoint>,
}

impl UsbHid {
    /// Resolve and claim the HID interface of an opened device.
    ///
    /// Finds the first HID-class interface, claims it exclusively
    /// (detaching a kernel driver where the platform supports it), and
    /// resolves the IN endpoint (mandatory) and OUT endpoint (optional).
    ///
    /// # Errors
    ///
    /// Fails if the device has no HID interface, the interface cannot be
    /// claimed, or no IN endpoint exists. These are fatal to session start.
    pub fn open(mut handle: DeviceHandle<GlobalContext>) -> Result<Self> {
        let config = handle.device().active_config_descriptor()?;

        let mut interface = None;
        let mut ep_in = None;
        let mut ep_out = None;

        'interfaces: for intf in config.interfaces() {
            for desc in intf.descriptors() {
                if desc.class_code() != LIBUSB_CLASS_HID {
                    continue;
                }

                debug!(interface = desc.interface_number(), "Found HID interface");

                for ep in desc.endpoint_descriptors() {
                    let endpoint = Endpoint {
                        address: ep.address(),
                        transfer: ep.transfer_type(),
                    };
                    debug!(
                        address = format!("0x{:02X}", ep.address()),
                        direction = ?ep.direction(),
                        max_packet = ep.max_packet_size(),
                        "Endpoint"
                    );
                    match ep.direction() {
                        Direction::In if ep_in.is_none() => ep_in = Some(endpoint),
                        Direction::Out if ep_out.is_none() => ep_out = Some(endpoint),
                        _ => {}
                    }
                }

                interface = Some(desc.interface_number());
                break 'interfaces;
            }
        }

        let interface = interface.ok_or(Error::NoHidInterface)?;
        let ep_in = ep_in.ok_or(Error::NoInEndpoint)?;

        if ep_out.is_none() {
            warn!("No OUT endpoint - passive (read-only) mode");
        }

        // Not supported on all platforms; claiming below still decides.
        if let Err(e) = handle.set_auto_detach_kernel_driver(true) {
            debug!("Kernel driver auto-detach unavailable: {e}");
        }

        handle.claim_interface(interface)?;
        debug!(interface, "Claimed HID interface");

        Ok(Self {
            handle,
            interface,
            ep_in,
            ep_out,
        })
    }

    fn transfer_in(&self, ep: Endpoint, buf: &mut [u8], timeout: Duration) -> rusb::Result<usize> {
        match ep.transfer {
            TransferType::Interrupt => self.handle.read_interrupt(ep.address, buf, timeout),
            _ => self.handle.read_bulk(ep.address, buf, timeout),
        }
    }

    fn transfer_out(&self, ep: Endpoint, data: &[u8], timeout: Duration) -> rusb::Result<usize> {
        match ep.transfer {
            TransferType::Interrupt => self.handle.write_interrupt(ep.address, data, timeout),
            _ => self.handle.write_bulk(ep.address, data, timeout),
        }
    }
}

impl RawHid for UsbHid {
    fn read_packet(&self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        match self.transfer_in(self.ep_in, buf, timeout) {
            Ok(n) => Ok(n),
            Err(rusb::Error::Timeout) => Err(Error::ReadTimeout),
            Err(e) => Err(Error::Usb(e)),
        }
    }

    fn write_packet(&self, data: &[u8], timeout: Duration) -> Result<usize> {
        let ep = self.ep_out.ok_or(Error::NoOutEndpoint)?;
        Ok(self.transfer_out(ep, data, timeout)?)
    }

    fn writable(&self) -> bool {
        self.ep_out.is_some()
    }
}

impl Drop for UsbHid {
    fn drop(&mut self) {
        if let Err(e) = self.handle.release_interface(self.interface) {
            warn!("Failed to release interface {}: {e}", self.interface);
        }
    }
}
