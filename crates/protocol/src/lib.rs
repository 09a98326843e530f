//! Wire-level types for usb-probe
//!
//! This crate defines everything about the vendor interrupt protocol that
//! does not need a USB stack: the fixed 64-byte frame, endpoint pairs and
//! the dialect table of the known vendor, response deduplication, and the
//! text line format used by the interactive shell.
//!
//! # Example
//!
//! ```
//! use protocol::{ProtocolVersion, EndpointPair};
//!
//! // Three interfaces: the V2 dialect
//! let version = ProtocolVersion::from_interface_count(3).unwrap();
//! assert_eq!(version, ProtocolVersion::V2);
//! assert_eq!(version.endpoints(), Some(EndpointPair::new(0x82, 0x03)));
//! ```
//!
//! # Operator lines
//!
//! ```
//! use protocol::{LineCommand, decode_line};
//!
//! let LineCommand::Send(frame) = decode_line("3 07 02 00").unwrap() else {
//!     unreachable!()
//! };
//! assert_eq!(frame.command(), 0x07);
//! ```

pub mod codec;
pub mod dedup;
pub mod error;
pub mod frame;
pub mod types;
pub mod version;

pub use codec::{LineCommand, decode_line, encode_line};
pub use dedup::{DEDUP_WINDOW, Deduplicator};
pub use error::{ProtocolError, Result};
pub use frame::{FRAME_LEN, Frame, RESET_OPCODE, RESET_SUBCOMMAND, Response};
pub use types::{EndpointOverride, EndpointPair, KNOWN_VENDOR_ID};
pub use version::ProtocolVersion;
