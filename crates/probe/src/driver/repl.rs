//! Interactive hex shell
//!
//! Each operator line is decoded into a frame, exchanged once without
//! deduplication, and the answer is echoed. A lost device gets one
//! re-init and one retry of the same frame before the failure is shown.

use crate::driver::DriverError;
use crate::usb::{Session, TransferOutcome, UsbBackend};
use common::ShutdownSignal;
use protocol::{Frame, LineCommand, decode_line};
use std::io::Write;
use tracing::{debug, info, warn};

/// Prompt printed before each line in verbose mode
pub const PROMPT: &str = "USB > ";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplOptions {
    /// Print [`PROMPT`] before reading each line
    pub prompt: bool,
}

/// Counters of one shell run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplSummary {
    pub lines: usize,
    pub exchanges: usize,
    /// Lines that could not be decoded
    pub rejected: usize,
    /// Exchanges that still failed after any retry
    pub errors: usize,
    pub reinits: usize,
    /// Ended by a zero byte count
    pub quit: bool,
    /// Ended by the stop signal
    pub interrupted: bool,
}

/// Run the shell until `0`, end of input, or the stop signal
pub fn run_repl<B, I, W>(
    session: &mut Session<B>,
    lines: I,
    out: &mut W,
    stop: &ShutdownSignal,
    options: ReplOptions,
) -> Result<ReplSummary, DriverError>
where
    B: UsbBackend,
    I: IntoIterator<Item = String>,
    W: Write,
{
    let mut summary = ReplSummary::default();
    let mut lines = lines.into_iter();

    loop {
        if stop.is_triggered() {
            summary.interrupted = true;
            break;
        }
        if options.prompt {
            write!(out, "{}", PROMPT)?;
            out.flush()?;
        }

        let Some(line) = lines.next() else {
            debug!("End of input");
            break;
        };
        if stop.is_triggered() {
            summary.interrupted = true;
            break;
        }
        summary.lines += 1;

        let frame = match decode_line(&line) {
            Ok(LineCommand::Send(frame)) => frame,
            Ok(LineCommand::Empty) => continue,
            Ok(LineCommand::Quit) => {
                debug!("No bytes specified, exiting");
                summary.quit = true;
                break;
            }
            Err(e) => {
                writeln!(out, "{}", e)?;
                summary.rejected += 1;
                continue;
            }
        };

        let outcome = exchange_with_retry(session, &frame, &mut summary);
        match outcome {
            TransferOutcome::Unique(response) => writeln!(out, "{}", response.frame)?,
            TransferOutcome::Acknowledged => writeln!(out, "Reset acknowledged")?,
            // Never produced without deduplication
            TransferOutcome::Duplicate => {}
            TransferOutcome::Failed(e) => {
                summary.errors += 1;
                writeln!(out, "Error: {}", e)?;
            }
        }
    }

    info!(
        "Shell finished: {} lines, {} exchanges, {} rejected, {} errors, {} re-inits",
        summary.lines, summary.exchanges, summary.rejected, summary.errors, summary.reinits
    );
    Ok(summary)
}

/// One exchange; on a lost device, one re-init and one retry
fn exchange_with_retry<B: UsbBackend>(
    session: &mut Session<B>,
    frame: &Frame,
    summary: &mut ReplSummary,
) -> TransferOutcome {
    summary.exchanges += 1;
    let outcome = session.exchange(frame);
    if !outcome.is_device_lost() {
        return outcome;
    }

    warn!("Device lost, re-initializing and retrying");
    summary.reinits += 1;
    if let Err(e) = session.reinit() {
        warn!("Re-initialization failed: {}", e);
        return outcome;
    }

    summary.exchanges += 1;
    session.exchange(frame)
}
