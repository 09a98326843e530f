//! Test utilities for usb-probe
//!
//! Provides a scripted mock device implementing the session traits, so the
//! acquisition, transfer and driver logic can be exercised without hardware.
//!
//! # Example
//!
//! ```
//! use probe::test_utils::{MockDevice, MockReply};
//! use probe::usb::UsbHandle;
//! use std::time::Duration;
//!
//! let device = MockDevice::new();
//! device.push_reply(MockReply::Data(vec![0x0e, 0x01]));
//!
//! let mut handle = device.handle();
//! let timeout = Duration::from_millis(10);
//! handle.write_interrupt(0x03, &[0u8; 64], timeout).unwrap();
//! let mut buf = [0u8; 64];
//! assert_eq!(handle.read_interrupt(0x82, &mut buf, timeout).unwrap(), 2);
//! ```

use crate::usb::device::{UsbBackend, UsbHandle};
use protocol::{FRAME_LEN, Frame, KNOWN_VENDOR_ID};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// How the mock answers one exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Send the request frame back unchanged
    Echo,
    /// Send these bytes (may be shorter than a frame, or empty)
    Data(Vec<u8>),
    /// Fail the write; the read is never attempted
    WriteError(rusb::Error),
    /// Accept the write, fail the read
    ReadError(rusb::Error),
}

type Responder = Box<dyn FnMut(&Frame) -> MockReply + Send>;

struct MockState {
    present: bool,
    vendor_id: u16,
    product_id: u16,
    interface_count: u8,
    active_configuration: u8,
    claim_failures: Vec<(u8, rusb::Error)>,
    script: VecDeque<MockReply>,
    responder: Responder,
    pending: Option<MockReply>,
    last_written: Frame,

    opens: usize,
    open_handles: usize,
    writes: Vec<(u8, Frame)>,
    reads: Vec<u8>,
    detached: Vec<u8>,
    attached: Vec<u8>,
    claimed: Vec<u8>,
    released: Vec<u8>,
    configurations_set: Vec<u8>,
}

/// Shared handle on a simulated device
///
/// Clones observe the same state, so a test keeps one clone for
/// assertions while the session owns the backend.
#[derive(Clone)]
pub struct MockDevice {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDevice {
    /// A present, V2-shaped (three interface) `1b1c:1b2e` device in
    /// configuration 1 that echoes every request
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                present: true,
                vendor_id: KNOWN_VENDOR_ID,
                product_id: 0x1b2e,
                interface_count: 3,
                active_configuration: 1,
                claim_failures: Vec::new(),
                script: VecDeque::new(),
                responder: Box::new(|_| MockReply::Echo),
                pending: None,
                last_written: Frame::zeroed(),
                opens: 0,
                open_handles: 0,
                writes: Vec::new(),
                reads: Vec::new(),
                detached: Vec::new(),
                attached: Vec::new(),
                claimed: Vec::new(),
                released: Vec::new(),
                configurations_set: Vec::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Backend that opens this device for any vendor and product ID
    pub fn backend(&self) -> MockBackend {
        MockBackend {
            device: self.clone(),
        }
    }

    /// An already open handle, bypassing the backend
    pub fn handle(&self) -> MockHandle {
        let mut state = self.state();
        state.opens += 1;
        state.open_handles += 1;
        MockHandle {
            device: self.clone(),
        }
    }

    pub fn set_present(&self, present: bool) {
        self.state().present = present;
    }

    /// IDs reported when the backend lists attached devices
    pub fn set_ids(&self, vendor_id: u16, product_id: u16) {
        let mut state = self.state();
        state.vendor_id = vendor_id;
        state.product_id = product_id;
    }

    pub fn set_interface_count(&self, count: u8) {
        self.state().interface_count = count;
    }

    pub fn set_active_configuration(&self, config: u8) {
        self.state().active_configuration = config;
    }

    /// Make every claim of `interface` fail with `error`
    pub fn fail_claim(&self, interface: u8, error: rusb::Error) {
        self.state().claim_failures.push((interface, error));
    }

    /// Queue a reply; queued replies are used before the responder
    pub fn push_reply(&self, reply: MockReply) {
        self.state().script.push_back(reply);
    }

    /// Answer unscripted exchanges with `responder`
    pub fn set_responder<F>(&self, responder: F)
    where
        F: FnMut(&Frame) -> MockReply + Send + 'static,
    {
        self.state().responder = Box::new(responder);
    }

    /// Number of successful opens
    pub fn opens(&self) -> usize {
        self.state().opens
    }

    /// Handles currently open
    pub fn open_handles(&self) -> usize {
        self.state().open_handles
    }

    /// Every attempted write as (endpoint, frame)
    pub fn writes(&self) -> Vec<(u8, Frame)> {
        self.state().writes.clone()
    }

    /// Endpoints of every attempted read
    pub fn reads(&self) -> Vec<u8> {
        self.state().reads.clone()
    }

    pub fn detached(&self) -> Vec<u8> {
        self.state().detached.clone()
    }

    pub fn attached(&self) -> Vec<u8> {
        self.state().attached.clone()
    }

    /// Interfaces currently claimed
    pub fn claimed(&self) -> Vec<u8> {
        self.state().claimed.clone()
    }

    pub fn released(&self) -> Vec<u8> {
        self.state().released.clone()
    }

    pub fn configurations_set(&self) -> Vec<u8> {
        self.state().configurations_set.clone()
    }
}

/// [`UsbBackend`] over a [`MockDevice`]
pub struct MockBackend {
    device: MockDevice,
}

impl UsbBackend for MockBackend {
    type Handle = MockHandle;

    fn open(&mut self, _vendor_id: u16, _product_id: u16) -> Result<MockHandle, rusb::Error> {
        if !self.device.state().present {
            return Err(rusb::Error::NotFound);
        }
        Ok(self.device.handle())
    }

    fn product_ids(&mut self, vendor_id: u16) -> Result<Vec<u16>, rusb::Error> {
        let state = self.device.state();
        if state.present && state.vendor_id == vendor_id {
            Ok(vec![state.product_id])
        } else {
            Ok(Vec::new())
        }
    }
}

/// Open handle on a [`MockDevice`]
pub struct MockHandle {
    device: MockDevice,
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        let mut state = self.device.state();
        state.open_handles -= 1;
        state.claimed.clear();
    }
}

impl UsbHandle for MockHandle {
    fn detach_kernel_driver(&mut self, interface: u8) -> Result<(), rusb::Error> {
        self.device.state().detached.push(interface);
        Ok(())
    }

    fn attach_kernel_driver(&mut self, interface: u8) -> Result<(), rusb::Error> {
        let mut state = self.device.state();
        state.attached.push(interface);
        // Only the interfaces a kernel driver was detached from can take one back
        if state.detached.contains(&interface) {
            Ok(())
        } else {
            Err(rusb::Error::NotFound)
        }
    }

    fn active_configuration(&mut self) -> Result<u8, rusb::Error> {
        Ok(self.device.state().active_configuration)
    }

    fn set_active_configuration(&mut self, config: u8) -> Result<(), rusb::Error> {
        let mut state = self.device.state();
        state.configurations_set.push(config);
        state.active_configuration = config;
        Ok(())
    }

    fn claim_interface(&mut self, interface: u8) -> Result<(), rusb::Error> {
        let mut state = self.device.state();
        if let Some((_, error)) = state
            .claim_failures
            .iter()
            .find(|(failing, _)| *failing == interface)
        {
            return Err(*error);
        }
        state.claimed.push(interface);
        Ok(())
    }

    fn release_interface(&mut self, interface: u8) -> Result<(), rusb::Error> {
        let mut state = self.device.state();
        state.released.push(interface);
        state.claimed.retain(|claimed| *claimed != interface);
        Ok(())
    }

    fn interface_count(&mut self) -> Result<u8, rusb::Error> {
        Ok(self.device.state().interface_count)
    }

    fn write_interrupt(
        &mut self,
        endpoint: u8,
        data: &[u8],
        _timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        let mut state = self.device.state();
        let frame = Frame::from_slice(data).map_err(|_| rusb::Error::Overflow)?;
        state.writes.push((endpoint, frame));
        state.last_written = frame;

        let reply = match state.script.pop_front() {
            Some(reply) => reply,
            None => (state.responder)(&frame),
        };

        if let MockReply::WriteError(error) = reply {
            state.pending = None;
            return Err(error);
        }
        state.pending = Some(reply);
        Ok(data.len())
    }

    fn read_interrupt(
        &mut self,
        endpoint: u8,
        buffer: &mut [u8],
        _timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        let mut state = self.device.state();
        state.reads.push(endpoint);

        match state.pending.take() {
            Some(MockReply::Echo) => {
                let len = buffer.len().min(FRAME_LEN);
                buffer[..len].copy_from_slice(&state.last_written.as_bytes()[..len]);
                Ok(len)
            }
            Some(MockReply::Data(data)) => {
                let len = buffer.len().min(data.len());
                buffer[..len].copy_from_slice(&data[..len]);
                Ok(len)
            }
            Some(MockReply::ReadError(error)) | Some(MockReply::WriteError(error)) => Err(error),
            // Nothing was asked; a real device stays silent
            None => Err(rusb::Error::Timeout),
        }
    }
}
