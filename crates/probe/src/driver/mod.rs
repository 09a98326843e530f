//! Front-end drivers
//!
//! Both drivers borrow an acquired [`Session`](crate::usb::Session), run
//! until their input is exhausted or the stop signal is raised, and return
//! a summary of what happened. Transcripts go to the supplied writer.

pub mod repl;
pub mod scan;

pub use repl::{ReplOptions, ReplSummary, run_repl};
pub use scan::{ByteRange, ScanHit, ScanPlan, ScanReport, run_scan};

use crate::usb::SessionError;
use thiserror::Error;

/// Failures that end a driver run
#[derive(Debug, Error)]
pub enum DriverError {
    /// Re-acquisition after a lost device failed
    #[error("Device recovery failed: {0}")]
    Recovery(#[from] SessionError),

    /// The transcript could not be written
    #[error("Failed to write transcript: {0}")]
    Output(#[from] std::io::Error),
}
