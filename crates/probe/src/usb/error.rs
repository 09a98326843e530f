//! Session and transfer error types

use protocol::ProtocolError;
use std::fmt;
use thiserror::Error;

/// Transfer direction, for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host to device (write endpoint)
    Out,
    /// Device to host (read endpoint)
    In,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Out => write!(f, "write"),
            Direction::In => write!(f, "read"),
        }
    }
}

/// Failures while acquiring or re-acquiring the device
///
/// All of these are fatal for the tools; the binaries print
/// [`SessionError::remediation`] and exit.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Device {vendor_id:04x}:{product_id:04x} not found")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    #[error("Failed to open device: {0}")]
    Open(rusb::Error),

    #[error("Failed to claim interface {interface}: {source}")]
    DriverClaimFailure {
        interface: u8,
        #[source]
        source: rusb::Error,
    },

    #[error("Failed to read configuration descriptor: {0}")]
    Descriptor(rusb::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Device handle is not open")]
    NotOpen,
}

impl SessionError {
    /// Operator-facing hint printed before exiting
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            SessionError::DeviceNotFound { .. } => {
                Some("Check the vendor and product ID (-v, -p) and that the device is plugged in.")
            }
            SessionError::Open(rusb::Error::Access)
            | SessionError::DriverClaimFailure {
                source: rusb::Error::Access,
                ..
            } => Some("Permission denied: run as root or add a udev rule for the device."),
            SessionError::DriverClaimFailure { .. } => {
                Some("Another driver still holds the interface; try unplugging the device.")
            }
            SessionError::Protocol(ProtocolError::ProtocolUnrecognized { .. }) => {
                Some("Select the protocol with -1, -2 or -3, or give the endpoints with -i and -o.")
            }
            SessionError::Protocol(ProtocolError::MissingEndpointOverride { missing, .. }) => {
                Some(if *missing == "Input" {
                    "You probably forgot to specify -i."
                } else {
                    "You probably forgot to specify -o."
                })
            }
            _ => None,
        }
    }
}

/// Failures of a single write-then-read exchange
///
/// None of these end a session by themselves; the drivers decide what to
/// do with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("Interrupt write error on endpoint {endpoint:#04x}: {source}")]
    Write { endpoint: u8, source: rusb::Error },

    #[error("Interrupt read error on endpoint {endpoint:#04x}: {source}")]
    Read { endpoint: u8, source: rusb::Error },

    /// No response within the transfer timeout
    #[error("Interrupt {direction} timed out on endpoint {endpoint:#04x}")]
    Timeout { direction: Direction, endpoint: u8 },

    /// The device disappeared; only a re-init can recover
    #[error("Device lost during interrupt {direction} on endpoint {endpoint:#04x}")]
    DeviceLost { direction: Direction, endpoint: u8 },
}

impl TransferError {
    /// Classify a libusb error from one stage of an exchange
    pub fn from_rusb(direction: Direction, endpoint: u8, err: rusb::Error) -> Self {
        match (err, direction) {
            (rusb::Error::NoDevice, _) => TransferError::DeviceLost {
                direction,
                endpoint,
            },
            (rusb::Error::Timeout, _) => TransferError::Timeout {
                direction,
                endpoint,
            },
            (source, Direction::Out) => TransferError::Write { endpoint, source },
            (source, Direction::In) => TransferError::Read { endpoint, source },
        }
    }

    pub fn is_device_lost(&self) -> bool {
        matches!(self, TransferError::DeviceLost { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TransferError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_rusb_errors() {
        assert_eq!(
            TransferError::from_rusb(Direction::Out, 0x03, rusb::Error::NoDevice),
            TransferError::DeviceLost {
                direction: Direction::Out,
                endpoint: 0x03
            }
        );
        assert!(TransferError::from_rusb(Direction::In, 0x82, rusb::Error::Timeout).is_timeout());
        assert_eq!(
            TransferError::from_rusb(Direction::Out, 0x03, rusb::Error::Pipe),
            TransferError::Write {
                endpoint: 0x03,
                source: rusb::Error::Pipe
            }
        );
        assert_eq!(
            TransferError::from_rusb(Direction::In, 0x82, rusb::Error::Io),
            TransferError::Read {
                endpoint: 0x82,
                source: rusb::Error::Io
            }
        );
    }

    #[test]
    fn test_remediation_hints() {
        let err = SessionError::Protocol(ProtocolError::MissingEndpointOverride {
            vendor_id: 0x046d,
            missing: "Output",
        });
        assert_eq!(err.remediation(), Some("You probably forgot to specify -o."));

        let err = SessionError::DeviceNotFound {
            vendor_id: 0x1b1c,
            product_id: 0x1b2e,
        };
        assert!(err.to_string().contains("1b1c:1b2e"));
        assert!(err.remediation().is_some());

        assert!(SessionError::NotOpen.remediation().is_none());
    }
}
