//! USB device abstraction
//!
//! The session layer talks to the device through two small traits so that
//! the same acquisition and transfer logic runs against libusb in the
//! binaries and against a scripted mock in tests. [`RusbBackend`] is the
//! libusb implementation.

use rusb::{Context, DeviceHandle, UsbContext};
use std::time::Duration;
use tracing::debug;

/// Opens devices by vendor and product ID
pub trait UsbBackend {
    type Handle: UsbHandle;

    /// Open the first device matching the IDs
    ///
    /// Returns `rusb::Error::NotFound` when no device matches.
    fn open(&mut self, vendor_id: u16, product_id: u16) -> Result<Self::Handle, rusb::Error>;

    /// Product IDs of attached devices from `vendor_id`, in bus order
    fn product_ids(&mut self, vendor_id: u16) -> Result<Vec<u16>, rusb::Error>;
}

/// Operations the session performs on an open device
///
/// Dropping the handle closes the device.
pub trait UsbHandle {
    fn detach_kernel_driver(&mut self, interface: u8) -> Result<(), rusb::Error>;

    fn attach_kernel_driver(&mut self, interface: u8) -> Result<(), rusb::Error>;

    fn active_configuration(&mut self) -> Result<u8, rusb::Error>;

    fn set_active_configuration(&mut self, config: u8) -> Result<(), rusb::Error>;

    fn claim_interface(&mut self, interface: u8) -> Result<(), rusb::Error>;

    fn release_interface(&mut self, interface: u8) -> Result<(), rusb::Error>;

    /// Number of interfaces in the active configuration
    fn interface_count(&mut self) -> Result<u8, rusb::Error>;

    fn write_interrupt(
        &mut self,
        endpoint: u8,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error>;

    fn read_interrupt(
        &mut self,
        endpoint: u8,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error>;
}

/// libusb backend
pub struct RusbBackend {
    context: Context,
}

impl RusbBackend {
    /// Create a new libusb context
    pub fn new() -> Result<Self, rusb::Error> {
        let context = Context::new()?;
        Ok(Self { context })
    }
}

impl UsbBackend for RusbBackend {
    type Handle = RusbHandle;

    fn open(&mut self, vendor_id: u16, product_id: u16) -> Result<RusbHandle, rusb::Error> {
        let handle = self
            .context
            .open_device_with_vid_pid(vendor_id, product_id)
            .ok_or(rusb::Error::NotFound)?;

        let device = handle.device();
        debug!(
            "Opened device {:04x}:{:04x} on bus {:03} address {:03}",
            vendor_id,
            product_id,
            device.bus_number(),
            device.address()
        );

        Ok(RusbHandle { handle })
    }

    fn product_ids(&mut self, vendor_id: u16) -> Result<Vec<u16>, rusb::Error> {
        let mut products = Vec::new();
        for device in self.context.devices()?.iter() {
            let descriptor = match device.device_descriptor() {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    debug!(
                        "Skipping device on bus {:03} address {:03}: {}",
                        device.bus_number(),
                        device.address(),
                        e
                    );
                    continue;
                }
            };
            if descriptor.vendor_id() == vendor_id {
                products.push(descriptor.product_id());
            }
        }
        Ok(products)
    }
}

/// Open libusb device handle
pub struct RusbHandle {
    handle: DeviceHandle<Context>,
}

impl UsbHandle for RusbHandle {
    fn detach_kernel_driver(&mut self, interface: u8) -> Result<(), rusb::Error> {
        self.handle.detach_kernel_driver(interface)
    }

    fn attach_kernel_driver(&mut self, interface: u8) -> Result<(), rusb::Error> {
        self.handle.attach_kernel_driver(interface)
    }

    fn active_configuration(&mut self) -> Result<u8, rusb::Error> {
        self.handle.active_configuration()
    }

    fn set_active_configuration(&mut self, config: u8) -> Result<(), rusb::Error> {
        self.handle.set_active_configuration(config)
    }

    fn claim_interface(&mut self, interface: u8) -> Result<(), rusb::Error> {
        self.handle.claim_interface(interface)
    }

    fn release_interface(&mut self, interface: u8) -> Result<(), rusb::Error> {
        self.handle.release_interface(interface)
    }

    fn interface_count(&mut self) -> Result<u8, rusb::Error> {
        let device = self.handle.device();
        // Some devices report no active configuration right after a
        // configuration change; the first configuration is the one we set.
        let config = match device.active_config_descriptor() {
            Ok(config) => config,
            Err(e) => {
                debug!("Active config descriptor unavailable ({}), using index 0", e);
                device.config_descriptor(0)?
            }
        };
        Ok(config.num_interfaces())
    }

    fn write_interrupt(
        &mut self,
        endpoint: u8,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        self.handle.write_interrupt(endpoint, data, timeout)
    }

    fn read_interrupt(
        &mut self,
        endpoint: u8,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        self.handle.read_interrupt(endpoint, buffer, timeout)
    }
}
