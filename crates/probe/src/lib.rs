//! USB probe toolkit
//!
//! Low-level diagnostics for vendor-specific interrupt protocols: acquire a
//! device, work out which endpoint dialect its firmware speaks, then either
//! sweep a command space (`usb-sniff`) or exchange operator-typed frames
//! (`usbsh`).
//!
//! The library never exits the process. Acquisition failures come back as
//! [`usb::SessionError`] for the binaries to report.

pub mod cli;
pub mod config;
pub mod driver;
pub mod runner;
pub mod test_utils;
pub mod usb;

pub use config::ProbeConfig;
pub use driver::{DriverError, ReplOptions, ReplSummary, ScanPlan, ScanReport, run_repl, run_scan};
pub use usb::{
    DedupMode, RusbBackend, Session, SessionError, SessionOptions, TransferError, TransferOutcome,
};
