//! Common utilities for usb-probe
//!
//! This crate provides shared functionality between the interactive shell
//! and the scanner: error handling, logging setup, numeric ID parsing, the
//! stop signal raised on operator interrupt, and the line bridge that feeds
//! standard input to the blocking USB thread.

pub mod channel;
pub mod error;
pub mod logging;
pub mod numbers;
pub mod shutdown;

pub use channel::{LineReceiver, LineSender, create_line_bridge, spawn_stdin_reader};
pub use error::{Error, Result};
pub use logging::{log_level_for, setup_logging};
pub use numbers::{parse_endpoint, parse_usb_id};
pub use shutdown::ShutdownSignal;
