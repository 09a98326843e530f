//! Fixed-size interrupt frames
//!
//! Every request and every response on the interrupt endpoints is exactly
//! [`FRAME_LEN`] bytes. Apart from the command byte and sub-command byte,
//! the contents are opaque.

use crate::error::{ProtocolError, Result};
use std::fmt;

/// Length of every frame on the wire
pub const FRAME_LEN: usize = 64;

/// Command byte of the device reset request
pub const RESET_OPCODE: u8 = 0x07;

/// Sub-command that, combined with [`RESET_OPCODE`], resets the device
pub const RESET_SUBCOMMAND: u8 = 0x02;

/// One 64-byte request or response buffer
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    /// An all-zero frame
    pub const fn zeroed() -> Self {
        Self([0; FRAME_LEN])
    }

    /// Build a frame from a prefix, zero-padding the rest
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        if data.len() > FRAME_LEN {
            return Err(ProtocolError::FrameTooLarge {
                size: data.len(),
                max: FRAME_LEN,
            });
        }

        let mut frame = Self::zeroed();
        frame.0[..data.len()].copy_from_slice(data);
        Ok(frame)
    }

    /// The `07 02` frame that asks the device to reset itself
    pub fn reset() -> Self {
        let mut frame = Self::zeroed();
        frame.0[0] = RESET_OPCODE;
        frame.0[1] = RESET_SUBCOMMAND;
        frame
    }

    /// Command (opcode) byte
    pub fn command(&self) -> u8 {
        self.0[0]
    }

    /// Sub-command byte
    pub fn sub_command(&self) -> u8 {
        self.0[1]
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8; FRAME_LEN] {
        &mut self.0
    }

    /// Set a single byte, returning the updated frame
    pub fn with_byte(mut self, position: usize, value: u8) -> Self {
        self.0[position] = value;
        self
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl From<[u8; FRAME_LEN]> for Frame {
    fn from(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Space separated lowercase hex, the transcript format used by both tools
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame(")?;
        write_hex(f, &self.0)?;
        write!(f, ")")
    }
}

/// A frame read back from the device
///
/// `len` is the number of bytes the device actually sent. The frame is
/// zero-filled past `len`, so a short read still compares as a full frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    pub frame: Frame,
    pub len: usize,
}

impl Response {
    pub fn new(frame: Frame, len: usize) -> Self {
        Self { frame, len }
    }

    /// Fewer than [`FRAME_LEN`] bytes arrived
    pub fn is_short(&self) -> bool {
        self.len < FRAME_LEN
    }

    /// The bytes the device actually sent
    pub fn data(&self) -> &[u8] {
        &self.frame.as_bytes()[..self.len.min(FRAME_LEN)]
    }
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{:02x}", byte)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_pads_with_zeros() {
        let frame = Frame::from_slice(&[0x0e, 0x01]).unwrap();
        assert_eq!(frame.command(), 0x0e);
        assert_eq!(frame.sub_command(), 0x01);
        assert!(frame.as_bytes()[2..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_from_slice_rejects_oversized() {
        let data = [0u8; FRAME_LEN + 1];
        assert_eq!(
            Frame::from_slice(&data),
            Err(ProtocolError::FrameTooLarge { size: 65, max: 64 })
        );
        assert!(Frame::from_slice(&[0u8; FRAME_LEN]).is_ok());
    }

    #[test]
    fn test_reset_frame() {
        let frame = Frame::reset();
        assert_eq!(frame.command(), RESET_OPCODE);
        assert_eq!(frame.sub_command(), RESET_SUBCOMMAND);
    }

    #[test]
    fn test_display_hex() {
        let frame = Frame::from_slice(&[0x07, 0xab]).unwrap();
        let text = frame.to_string();
        assert!(text.starts_with("07 ab 00"));
        assert_eq!(text.split(' ').count(), FRAME_LEN);
    }

    #[test]
    fn test_short_response() {
        let response = Response::new(Frame::from_slice(&[1, 2, 3]).unwrap(), 3);
        assert!(response.is_short());
        assert_eq!(response.data(), &[1, 2, 3]);

        let full = Response::new(Frame::zeroed(), FRAME_LEN);
        assert!(!full.is_short());
    }
}
