//! USB transfer execution
//!
//! One logical request is a write of a full frame to the OUT endpoint
//! followed by a read of up to a full frame from the IN endpoint. Both
//! transfers are synchronous and bounded by a short timeout so a silent
//! device never stalls a scan.

use crate::usb::device::UsbHandle;
use crate::usb::error::{Direction, TransferError};
use protocol::{EndpointPair, FRAME_LEN, Frame, ProtocolVersion, RESET_OPCODE, Response};
use std::time::Duration;
use tracing::{debug, trace};

/// Default timeout for scan transfers
pub const SCAN_TIMEOUT: Duration = Duration::from_millis(10);

/// Default timeout for interactive transfers
pub const SHELL_TIMEOUT: Duration = Duration::from_millis(100);

/// Result of a successful exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    /// The device answered (possibly short)
    Response(Response),
    /// A reset request answered with no data
    Acknowledged,
}

/// Whether a response should go through the deduplicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupMode {
    /// Report every response
    Off,
    /// Report only responses that differ from the previous one
    On,
}

/// Outcome of [`Session::send`](crate::usb::Session::send)
///
/// A duplicate is a control signal for the scanner, never an I/O failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// A response; with [`DedupMode::On`] it is also new information
    Unique(Response),
    /// Same payload as the previous response
    Duplicate,
    /// Reset acknowledged without data
    Acknowledged,
    /// The exchange failed
    Failed(TransferError),
}

impl TransferOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            TransferOutcome::Unique(response) => Some(response),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&TransferError> {
        match self {
            TransferOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_device_lost(&self) -> bool {
        self.error().is_some_and(TransferError::is_device_lost)
    }
}

/// Resolved interrupt endpoint pair plus the rules that depend on the dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferChannel {
    endpoints: EndpointPair,
    protocol: ProtocolVersion,
    timeout: Duration,
}

impl TransferChannel {
    pub fn new(endpoints: EndpointPair, protocol: ProtocolVersion, timeout: Duration) -> Self {
        Self {
            endpoints,
            protocol,
            timeout,
        }
    }

    pub fn endpoints(&self) -> EndpointPair {
        self.endpoints
    }

    pub fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Write `frame` and read the answer
    ///
    /// A write failure skips the read. A short read is logged and returned
    /// as a normal response.
    pub fn exchange<H>(&self, handle: &mut H, frame: &Frame) -> Result<Exchange, TransferError>
    where
        H: UsbHandle + ?Sized,
    {
        debug!("URB interrupt question: {}", frame);

        let written = handle
            .write_interrupt(self.endpoints.write, frame.as_bytes(), self.timeout)
            .map_err(|e| TransferError::from_rusb(Direction::Out, self.endpoints.write, e))?;
        if written != FRAME_LEN {
            trace!("Interrupt write accepted {} of {} bytes", written, FRAME_LEN);
        }

        let mut answer = Frame::zeroed();
        let len = handle
            .read_interrupt(self.endpoints.read, answer.as_mut_bytes(), self.timeout)
            .map_err(|e| TransferError::from_rusb(Direction::In, self.endpoints.read, e))?;
        let len = len.min(FRAME_LEN);

        if len < FRAME_LEN {
            debug!(
                "Interrupt transfer short read ({} of {} bytes) on endpoint {:#04x}",
                len, FRAME_LEN, self.endpoints.read
            );
        }

        if len == 0 && frame.command() == RESET_OPCODE && self.protocol.acknowledges_empty_reset()
        {
            debug!("Reset acknowledged without data");
            return Ok(Exchange::Acknowledged);
        }

        let response = Response::new(answer, len);
        debug!("URB interrupt answer: {}", response.frame);
        Ok(Exchange::Response(response))
    }
}
