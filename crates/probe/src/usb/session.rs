//! Device session lifecycle
//!
//! A [`Session`] owns the only open handle to the target device. It performs
//! acquisition (open, kernel driver detach, configuration, interface claims,
//! dialect detection), routes exchanges through the resolved
//! [`TransferChannel`], and restores the device to the kernel on teardown.
//! Teardown runs from `Drop`, so every exit path releases the device.

use crate::usb::device::{UsbBackend, UsbHandle};
use crate::usb::error::{Direction, SessionError, TransferError};
use crate::usb::transfers::{DedupMode, Exchange, SHELL_TIMEOUT, TransferChannel, TransferOutcome};
use protocol::{
    Deduplicator, EndpointOverride, EndpointPair, Frame, KNOWN_VENDOR_ID, ProtocolError,
    ProtocolVersion,
};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Interfaces whose kernel drivers are detached before claiming
const DETACH_INTERFACES: [u8; 2] = [0, 1];

/// Vendor interfaces claimed for the exchange endpoints
const CLAIM_INTERFACES: [u8; 2] = [1, 2];

/// Interfaces handed back to the kernel on teardown
const REATTACH_INTERFACES: [u8; 3] = [0, 1, 2];

/// Configuration the vendor interfaces live in
const TARGET_CONFIGURATION: u8 = 1;

/// What the operator asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Requested dialect; `Auto` reads the interface count
    pub protocol: ProtocolVersion,
    /// Explicit endpoints (`-i`, `-o`)
    pub endpoints: EndpointOverride,
    /// Timeout applied to each write and each read
    pub timeout: Duration,
}

impl SessionOptions {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            protocol: ProtocolVersion::Auto,
            endpoints: EndpointOverride::default(),
            timeout: SHELL_TIMEOUT,
        }
    }

    pub fn with_protocol(mut self, protocol: ProtocolVersion) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_endpoints(mut self, endpoints: EndpointOverride) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether the operator's endpoints replace the dialect table
    fn uses_override(&self) -> bool {
        self.vendor_id != KNOWN_VENDOR_ID
            || self.protocol == ProtocolVersion::Override
            || !self.endpoints.is_empty()
    }
}

/// Product ID of the first attached device from the known vendor
///
/// Other vendors have no predictable product range, so nothing is
/// discovered for them. Listing failures are logged and yield `None`.
pub fn discover_product<B: UsbBackend>(backend: &mut B, vendor_id: u16) -> Option<u16> {
    if vendor_id != KNOWN_VENDOR_ID {
        return None;
    }
    let products = match backend.product_ids(vendor_id) {
        Ok(products) => products,
        Err(e) => {
            warn!("Failed to list USB devices: {}", e);
            return None;
        }
    };
    let product_id = *products.first()?;
    if products.len() > 1 {
        warn!(
            "{} devices from vendor {:04x} attached, using {:04x}:{:04x}",
            products.len(),
            vendor_id,
            vendor_id,
            product_id
        );
    } else {
        info!("Found device {:04x}:{:04x}", vendor_id, product_id);
    }
    Some(product_id)
}

/// Whether this is the initial acquisition or a re-detection after loss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    /// Claim failures abort
    First,
    /// Claim failures are only reported
    Redetect,
}

/// Exclusive session on one USB device
pub struct Session<B: UsbBackend> {
    backend: B,
    options: SessionOptions,
    handle: Option<B::Handle>,
    /// Interfaces we claimed and must release
    claimed: Vec<u8>,
    channel: Option<TransferChannel>,
    dedup: Deduplicator,
    reinits: usize,
}

impl<B: UsbBackend> Session<B> {
    /// Open and fully acquire the device
    ///
    /// On failure the partially acquired device is torn down before the
    /// error is returned.
    pub fn open(backend: B, options: SessionOptions) -> Result<Self, SessionError> {
        let mut session = Self {
            backend,
            options,
            handle: None,
            claimed: Vec::new(),
            channel: None,
            dedup: Deduplicator::new(),
            reinits: 0,
        };
        session.acquire(Acquisition::First)?;
        Ok(session)
    }

    fn acquire(&mut self, acquisition: Acquisition) -> Result<(), SessionError> {
        let result = self.try_acquire(acquisition);
        if result.is_err() {
            self.teardown();
        }
        result
    }

    fn try_acquire(&mut self, acquisition: Acquisition) -> Result<(), SessionError> {
        self.open_handle()?;
        self.prepare(acquisition)?;
        self.detect_protocol()?;
        Ok(())
    }

    fn open_handle(&mut self) -> Result<(), SessionError> {
        let SessionOptions {
            vendor_id,
            product_id,
            ..
        } = self.options;
        debug!("Opening device {:04x}:{:04x}", vendor_id, product_id);

        let handle = self
            .backend
            .open(vendor_id, product_id)
            .map_err(|e| match e {
                rusb::Error::NotFound => SessionError::DeviceNotFound {
                    vendor_id,
                    product_id,
                },
                other => SessionError::Open(other),
            })?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Detach kernel drivers, select configuration 1 and claim the vendor
    /// interfaces
    pub fn prepare(&mut self, acquisition: Acquisition) -> Result<(), SessionError> {
        let handle = self.handle.as_mut().ok_or(SessionError::NotOpen)?;

        for interface in DETACH_INTERFACES {
            match handle.detach_kernel_driver(interface) {
                Ok(()) => debug!("Detached kernel driver from interface {}", interface),
                Err(e) => debug!("Kernel driver detach on interface {}: {}", interface, e),
            }
        }

        match handle.active_configuration() {
            Ok(TARGET_CONFIGURATION) => {
                debug!("Active configuration is {}", TARGET_CONFIGURATION);
            }
            Ok(config) => {
                debug!(
                    "Active configuration is {}, setting {}",
                    config, TARGET_CONFIGURATION
                );
                if let Err(e) = handle.set_active_configuration(TARGET_CONFIGURATION) {
                    warn!("Failed to set configuration {}: {}", TARGET_CONFIGURATION, e);
                }
            }
            Err(e) => warn!("Failed to read active configuration: {}", e),
        }

        for interface in CLAIM_INTERFACES {
            match handle.claim_interface(interface) {
                Ok(()) => {
                    debug!("Claimed interface {}", interface);
                    self.claimed.push(interface);
                }
                // Two-interface devices have no interface 2
                Err(rusb::Error::NotFound) => {
                    debug!("Interface {} does not exist, not claimed", interface);
                }
                Err(source) => match acquisition {
                    Acquisition::First => {
                        return Err(SessionError::DriverClaimFailure { interface, source });
                    }
                    Acquisition::Redetect => {
                        warn!("Failed to claim interface {}: {}", interface, source);
                    }
                },
            }
        }

        Ok(())
    }

    /// Resolve the endpoint pair and install the transfer channel
    pub fn detect_protocol(&mut self) -> Result<EndpointPair, SessionError> {
        let handle = self.handle.as_mut().ok_or(SessionError::NotOpen)?;
        let options = &self.options;

        let (protocol, endpoints) = if options.uses_override() {
            let pair = options.endpoints.complete(options.vendor_id)?;
            (ProtocolVersion::Override, pair)
        } else {
            let protocol = match options.protocol {
                ProtocolVersion::Auto => {
                    let count = handle.interface_count().map_err(SessionError::Descriptor)?;
                    debug!("Active configuration has {} interfaces", count);
                    ProtocolVersion::from_interface_count(count)?
                }
                explicit => explicit,
            };
            let pair = protocol
                .endpoints()
                .ok_or(ProtocolError::ProtocolUnrecognized { count: 0 })?;
            (protocol, pair)
        };

        info!("Using protocol version {} ({})", protocol, endpoints);
        self.channel = Some(TransferChannel::new(endpoints, protocol, options.timeout));
        Ok(endpoints)
    }

    /// Close, reopen and re-detect; clears the deduplication cache
    pub fn reinit(&mut self) -> Result<(), SessionError> {
        info!("Re-initializing device");
        self.teardown();
        self.reinits += 1;
        self.dedup.reset();
        self.acquire(Acquisition::Redetect)
    }

    /// Exchange one frame without deduplication
    pub fn exchange(&mut self, frame: &Frame) -> TransferOutcome {
        self.send(frame, DedupMode::Off)
    }

    /// Exchange one frame, optionally filtering repeated responses
    pub fn send(&mut self, frame: &Frame, mode: DedupMode) -> TransferOutcome {
        let Some(channel) = self.channel else {
            return device_lost(0);
        };
        // Only missing after a failed re-init
        let Some(handle) = self.handle.as_mut() else {
            return device_lost(channel.endpoints().write);
        };

        match channel.exchange(handle, frame) {
            Ok(Exchange::Acknowledged) => TransferOutcome::Acknowledged,
            Ok(Exchange::Response(response)) => match mode {
                DedupMode::Off => TransferOutcome::Unique(response),
                DedupMode::On if self.dedup.is_unique(&response.frame) => {
                    TransferOutcome::Unique(response)
                }
                DedupMode::On => TransferOutcome::Duplicate,
            },
            Err(e) => {
                debug!("Exchange failed: {}", e);
                TransferOutcome::Failed(e)
            }
        }
    }

    /// Send the reset frame, wait for the device to come back, re-init
    pub fn reset_device(&mut self, settle: Duration) -> Result<TransferOutcome, SessionError> {
        info!("Resetting device");
        let outcome = self.exchange(&Frame::reset());
        match &outcome {
            TransferOutcome::Failed(e) => warn!("Reset request failed: {}", e),
            _ => debug!("Reset request sent"),
        }

        if !settle.is_zero() {
            debug!("Waiting {:?} for the device to settle", settle);
            thread::sleep(settle);
        }

        self.reinit()?;
        Ok(outcome)
    }

    /// Release interfaces, hand drivers back to the kernel, close the handle
    ///
    /// Errors are logged and otherwise ignored. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        let Some(mut handle) = self.handle.take() else {
            return;
        };

        for interface in self.claimed.drain(..) {
            if let Err(e) = handle.release_interface(interface) {
                warn!("Failed to release interface {}: {}", interface, e);
            }
        }

        for interface in REATTACH_INTERFACES {
            match handle.attach_kernel_driver(interface) {
                Ok(()) => debug!("Reattached kernel driver to interface {}", interface),
                Err(e) => debug!(
                    "Could not reattach kernel driver to interface {}: {}",
                    interface, e
                ),
            }
        }

        drop(handle);
        debug!("Closed device");
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Resolved dialect, `None` before the first detection
    pub fn protocol(&self) -> Option<ProtocolVersion> {
        self.channel.map(|c| c.protocol())
    }

    /// Resolved endpoints, `None` before the first detection
    pub fn endpoints(&self) -> Option<EndpointPair> {
        self.channel.map(|c| c.endpoints())
    }

    /// Number of completed or attempted re-inits
    pub fn reinits(&self) -> usize {
        self.reinits
    }
}

fn device_lost(endpoint: u8) -> TransferOutcome {
    TransferOutcome::Failed(TransferError::DeviceLost {
        direction: Direction::Out,
        endpoint,
    })
}

impl<B: UsbBackend> Drop for Session<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
