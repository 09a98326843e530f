//! Endpoint type definitions
//!
//! An endpoint address carries the direction in bit 7: `0x82` is IN
//! endpoint 2 (device to host), `0x03` is OUT endpoint 3.

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Vendor whose firmware generations use the known dialect table
pub const KNOWN_VENDOR_ID: u16 = 0x1b1c;

/// Resolved (read, write) interrupt endpoint addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointPair {
    /// IN endpoint the response is read from
    pub read: u8,
    /// OUT endpoint the request is written to
    pub write: u8,
}

impl EndpointPair {
    pub const fn new(read: u8, write: u8) -> Self {
        Self { read, write }
    }
}

impl fmt::Display for EndpointPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "read {:#04x}, write {:#04x}", self.read, self.write)
    }
}

/// Endpoints given explicitly by the operator
///
/// Either side may be missing; an override is only usable once both are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointOverride {
    /// Endpoint to receive from (`-i`)
    pub input: Option<u8>,
    /// Endpoint to send to (`-o`)
    pub output: Option<u8>,
}

impl EndpointOverride {
    pub fn new(input: Option<u8>, output: Option<u8>) -> Self {
        Self { input, output }
    }

    /// Neither endpoint was given
    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none()
    }

    /// Both endpoints as a pair, or `MissingEndpointOverride` naming the gap
    pub fn complete(&self, vendor_id: u16) -> Result<EndpointPair> {
        match (self.input, self.output) {
            (Some(read), Some(write)) => Ok(EndpointPair::new(read, write)),
            (None, _) => Err(ProtocolError::MissingEndpointOverride {
                vendor_id,
                missing: "Input",
            }),
            (Some(_), None) => Err(ProtocolError::MissingEndpointOverride {
                vendor_id,
                missing: "Output",
            }),
        }
    }
}
