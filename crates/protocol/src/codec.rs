//! Operator line codec
//!
//! The interactive shell reads requests as text lines of the form
//!
//! ```text
//! <decimal byte count> <hex byte> <hex byte> ...
//! ```
//!
//! e.g. `3 07 02 00`. The declared bytes become the start of a frame and
//! the rest of the frame is zero. A count of zero ends the session.

use crate::error::{ProtocolError, Result};
use crate::frame::{FRAME_LEN, Frame};

/// A decoded operator line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCommand {
    /// Send this frame
    Send(Frame),
    /// Byte count of zero: stop reading
    Quit,
    /// Nothing but whitespace
    Empty,
}

/// Decode one operator line
///
/// Tokens after the declared byte count are ignored.
pub fn decode_line(line: &str) -> Result<LineCommand> {
    let mut tokens = line.split_whitespace();

    let Some(count_token) = tokens.next() else {
        return Ok(LineCommand::Empty);
    };

    let count: usize = count_token
        .parse()
        .map_err(|_| ProtocolError::InvalidByteCount(count_token.to_string()))?;

    if count == 0 {
        return Ok(LineCommand::Quit);
    }

    if count > FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            size: count,
            max: FRAME_LEN,
        });
    }

    let mut frame = Frame::zeroed();
    for position in 0..count {
        let token = tokens.next().ok_or(ProtocolError::MissingBytes {
            expected: count,
            actual: position,
        })?;
        frame.as_mut_bytes()[position] = parse_hex_byte(token).ok_or_else(|| {
            ProtocolError::InvalidHexByte {
                position,
                token: token.to_string(),
            }
        })?;
    }

    Ok(LineCommand::Send(frame))
}

/// Encode bytes as an operator line that [`decode_line`] accepts
pub fn encode_line(data: &[u8]) -> String {
    let mut line = data.len().to_string();
    for byte in data {
        line.push_str(&format!(" {:02x}", byte));
    }
    line
}

/// One or two hex digits, no prefix or sign
fn parse_hex_byte(token: &str) -> Option<u8> {
    if token.is_empty() || token.len() > 2 || !token.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(token, 16).ok()
}
