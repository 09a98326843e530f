//! Protocol error types

use thiserror::Error;

/// Protocol-level errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The interface count of the active configuration matches no known dialect
    #[error("Failed to autodetect protocol: unrecognized interface count {count}")]
    ProtocolUnrecognized { count: u8 },

    /// The device is not from the known vendor and endpoints were not given
    #[error(
        "{missing} endpoint is not set and device {vendor_id:#06x} is not from the known vendor"
    )]
    MissingEndpointOverride {
        vendor_id: u16,
        missing: &'static str,
    },

    /// Frame data exceeds the fixed frame length
    #[error("Packet too big: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The leading byte count of an operator line is not a decimal number
    #[error("Invalid byte count '{0}'")]
    InvalidByteCount(String),

    /// A byte token of an operator line is not one or two hex digits
    #[error("Invalid hex byte '{token}' at position {position}")]
    InvalidHexByte { position: usize, token: String },

    /// An operator line carries fewer bytes than it declares
    #[error("Missing bytes: expected {expected}, got {actual}")]
    MissingBytes { expected: usize, actual: usize },
}

/// Type alias for protocol results
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::ProtocolUnrecognized { count: 5 };
        let msg = format!("{}", err);
        assert!(msg.contains("Failed to autodetect protocol"));
        assert!(msg.contains('5'));
    }

    #[test]
    fn test_missing_endpoint_display() {
        let err = ProtocolError::MissingEndpointOverride {
            vendor_id: 0x046d,
            missing: "Input",
        };
        let msg = format!("{}", err);
        assert!(msg.starts_with("Input endpoint"));
        assert!(msg.contains("0x046d"));
    }

    #[test]
    fn test_frame_too_large_error() {
        let err = ProtocolError::FrameTooLarge { size: 65, max: 64 };
        let msg = format!("{}", err);
        assert!(msg.contains("Packet too big"));
    }
}
