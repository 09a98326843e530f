//! USB subsystem
//!
//! Device acquisition and transfer handling for the diagnostic tools:
//! - Backend traits over libusb and the libusb implementation
//! - Session lifecycle (open, prepare, detect, re-init, teardown)
//! - Interrupt write-then-read exchange with timeouts
//!
//! Everything here is blocking and used from a single thread.

pub mod device;
pub mod error;
pub mod session;
pub mod transfers;

pub use device::{RusbBackend, RusbHandle, UsbBackend, UsbHandle};
pub use error::{Direction, SessionError, TransferError};
pub use session::{Acquisition, Session, SessionOptions, discover_product};
pub use transfers::{
    DedupMode, Exchange, SCAN_TIMEOUT, SHELL_TIMEOUT, TransferChannel, TransferOutcome,
};
