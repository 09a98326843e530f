//! Protocol version (dialect) management
//!
//! Firmware generations of the known vendor differ in how many interfaces
//! they expose and which interrupt endpoints carry the vendor protocol.

use crate::error::{ProtocolError, Result};
use crate::types::EndpointPair;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport dialect requested by the operator or resolved by detection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    /// Detect from the interface count (never left after detection)
    #[default]
    Auto,
    /// Four interfaces, endpoints 0x84/0x04
    V1,
    /// HID interface plus separate vendor IN and OUT interfaces, 0x82/0x03
    V2,
    /// HID interface plus one vendor I/O interface, 0x81/0x02
    V3,
    /// Endpoints given explicitly
    Override,
}

impl ProtocolVersion {
    /// Map the interface count of the active configuration to a dialect
    pub fn from_interface_count(count: u8) -> Result<Self> {
        match count {
            2 => Ok(ProtocolVersion::V3),
            3 => Ok(ProtocolVersion::V2),
            4 => Ok(ProtocolVersion::V1),
            _ => Err(ProtocolError::ProtocolUnrecognized { count }),
        }
    }

    /// Fixed endpoints of a known dialect
    pub fn endpoints(self) -> Option<EndpointPair> {
        match self {
            ProtocolVersion::V1 => Some(EndpointPair::new(0x84, 0x04)),
            ProtocolVersion::V2 => Some(EndpointPair::new(0x82, 0x03)),
            ProtocolVersion::V3 => Some(EndpointPair::new(0x81, 0x02)),
            ProtocolVersion::Auto | ProtocolVersion::Override => None,
        }
    }

    /// Whether a zero-length answer to a reset counts as an acknowledgment
    ///
    /// Unknown devices may return empty frames for other reasons, so the
    /// rule only holds for the known dialects.
    pub fn acknowledges_empty_reset(self) -> bool {
        self != ProtocolVersion::Override
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::Auto => write!(f, "auto"),
            ProtocolVersion::V1 => write!(f, "1"),
            ProtocolVersion::V2 => write!(f, "2"),
            ProtocolVersion::V3 => write!(f, "3"),
            ProtocolVersion::Override => write!(f, "override"),
        }
    }
}
