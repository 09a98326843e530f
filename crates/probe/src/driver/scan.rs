//! Brute-force command scanner
//!
//! Walks a two-byte command space over a fixed base frame in ascending
//! lexicographic order. Each candidate is sent twice: the first exchange
//! primes the device, the second goes through the deduplicator and is
//! reported when its payload differs from the previous unique response.
//! Only a lost device cuts a candidate short.

use crate::driver::DriverError;
use crate::usb::{DedupMode, Session, TransferOutcome, UsbBackend};
use common::ShutdownSignal;
use protocol::{FRAME_LEN, Frame, Response};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use tracing::{debug, info, trace, warn};

/// Inclusive byte range, written `00-ff`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub start: u8,
    pub end: u8,
}

impl ByteRange {
    /// Every byte value
    pub const FULL: ByteRange = ByteRange {
        start: 0x00,
        end: 0xff,
    };

    pub fn new(start: u8, end: u8) -> Result<Self, String> {
        if start > end {
            return Err(format!("Range start {:02x} is above end {:02x}", start, end));
        }
        Ok(Self { start, end })
    }

    /// Number of values in the range, never zero
    pub fn count(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + use<> {
        self.start..=self.end
    }
}

impl FromStr for ByteRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            u8::from_str_radix(part.trim(), 16)
                .map_err(|_| format!("Invalid hex byte '{}' in range '{}'", part.trim(), s))
        };
        match s.split_once('-') {
            Some((start, end)) => Self::new(parse(start)?, parse(end)?),
            None => {
                let value = parse(s)?;
                Self::new(value, value)
            }
        }
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}-{:02x}", self.start, self.end)
    }
}

/// What to scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPlan {
    /// Frame every candidate starts from
    pub base: Frame,
    /// Position of the first varied byte; the second follows it
    pub first_position: usize,
    pub first: ByteRange,
    pub second: ByteRange,
}

impl Default for ScanPlan {
    fn default() -> Self {
        Self {
            base: Frame::zeroed().with_byte(0, 0x0e),
            first_position: 2,
            first: ByteRange::FULL,
            second: ByteRange::FULL,
        }
    }
}

impl ScanPlan {
    pub fn new(base: Frame, first_position: usize) -> Result<Self, String> {
        if first_position >= FRAME_LEN - 1 {
            return Err(format!(
                "Scan position {} leaves no room for a second byte in a {}-byte frame",
                first_position, FRAME_LEN
            ));
        }
        Ok(Self {
            base,
            first_position,
            ..Self::default()
        })
    }

    pub fn with_ranges(mut self, first: ByteRange, second: ByteRange) -> Self {
        self.first = first;
        self.second = second;
        self
    }

    pub fn second_position(&self) -> usize {
        self.first_position + 1
    }

    /// Number of candidates, never zero
    pub fn candidate_count(&self) -> usize {
        self.first.count() * self.second.count()
    }

    /// Candidate frames in ascending (first, second) order
    pub fn candidates(&self) -> impl Iterator<Item = (u8, u8, Frame)> + '_ {
        self.first.iter().flat_map(move |first| {
            self.second.iter().map(move |second| {
                let frame = self
                    .base
                    .with_byte(self.first_position, first)
                    .with_byte(self.second_position(), second);
                (first, second, frame)
            })
        })
    }
}

/// A candidate that produced new information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanHit {
    pub first: u8,
    pub second: u8,
    pub request: Frame,
    pub response: Response,
}

/// Counters and hits of one scan run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Candidates attempted
    pub candidates: usize,
    pub exchanges: usize,
    pub hits: Vec<ScanHit>,
    pub duplicates: usize,
    pub errors: usize,
    pub reinits: usize,
    /// Stopped by the operator before the plan was exhausted
    pub interrupted: bool,
}

/// Run `plan` against the session
///
/// Lost devices are re-acquired and the scan resumes at the next
/// candidate. Any other failed send is counted and the candidate is
/// classified by its second send. A failed re-acquisition ends the run.
pub fn run_scan<B, W>(
    session: &mut Session<B>,
    plan: &ScanPlan,
    stop: &ShutdownSignal,
    out: &mut W,
) -> Result<ScanReport, DriverError>
where
    B: UsbBackend,
    W: Write,
{
    let mut report = ScanReport::default();
    info!(
        "Scanning {} candidates (bytes {} and {}, ranges {} and {})",
        plan.candidate_count(),
        plan.first_position,
        plan.second_position(),
        plan.first,
        plan.second
    );

    for (first, second, frame) in plan.candidates() {
        if stop.is_triggered() {
            info!("Scan interrupted at {:02x} {:02x}", first, second);
            report.interrupted = true;
            break;
        }
        report.candidates += 1;
        trace!("Candidate {:02x} {:02x}", first, second);

        report.exchanges += 1;
        let outcome = match session.send(&frame, DedupMode::Off) {
            TransferOutcome::Failed(e) if e.is_device_lost() => TransferOutcome::Failed(e),
            primed => {
                if let TransferOutcome::Failed(e) = primed {
                    debug!("Candidate {:02x} {:02x} first send failed: {}", first, second, e);
                    report.errors += 1;
                }
                report.exchanges += 1;
                session.send(&frame, DedupMode::On)
            }
        };

        match outcome {
            TransferOutcome::Unique(response) => {
                writeln!(
                    out,
                    "{:02x} {:02x} seems to do something: {}",
                    first, second, response.frame
                )?;
                report.hits.push(ScanHit {
                    first,
                    second,
                    request: frame,
                    response,
                });
            }
            TransferOutcome::Duplicate => report.duplicates += 1,
            TransferOutcome::Acknowledged => {
                trace!("Candidate {:02x} {:02x} acknowledged", first, second);
            }
            TransferOutcome::Failed(e) if e.is_device_lost() => {
                warn!("Device lost at {:02x} {:02x}, re-initializing", first, second);
                report.errors += 1;
                report.reinits += 1;
                session.reinit()?;
            }
            TransferOutcome::Failed(e) => {
                debug!("Candidate {:02x} {:02x} failed: {}", first, second, e);
                report.errors += 1;
            }
        }
    }

    info!(
        "Scan finished: {} candidates, {} exchanges, {} hits, {} errors, {} re-inits",
        report.candidates,
        report.exchanges,
        report.hits.len(),
        report.errors,
        report.reinits
    );
    Ok(report)
}
