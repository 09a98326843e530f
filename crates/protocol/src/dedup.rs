//! Response deduplication for brute-force scans
//!
//! A scan sends thousands of candidate frames and most of them produce the
//! same answer. Only a response whose payload differs from the previous one
//! is worth reporting.
//!
//! # Usage
//!
//! ```
//! use protocol::{Deduplicator, Frame};
//!
//! let mut dedup = Deduplicator::new();
//! let frame = Frame::from_slice(&[0x0e, 0x01, 0x00, 0x00, 0xaa]).unwrap();
//!
//! assert!(dedup.is_unique(&frame));
//! assert!(!dedup.is_unique(&frame));
//! ```

use crate::frame::{FRAME_LEN, Frame};
use std::ops::Range;

/// Bytes compared when deciding whether a response is new
///
/// The first four bytes echo the request header and are ignored.
pub const DEDUP_WINDOW: Range<usize> = 4..FRAME_LEN;

/// Last-response cache
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    last: Option<Frame>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and caches the frame when its payload differs from the
    /// cached one, `false` when it is a repeat
    pub fn is_unique(&mut self, frame: &Frame) -> bool {
        if let Some(last) = &self.last {
            if same_payload(last, frame) {
                return false;
            }
        }

        self.last = Some(*frame);
        true
    }

    /// Forget the cached frame; the next response is always unique
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// The cached frame, if any response has been seen
    pub fn last(&self) -> Option<&Frame> {
        self.last.as_ref()
    }
}

#[inline]
fn same_payload(a: &Frame, b: &Frame) -> bool {
    a.as_bytes()[DEDUP_WINDOW] == b.as_bytes()[DEDUP_WINDOW]
}
