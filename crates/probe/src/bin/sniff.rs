//! usb-sniff
//!
//! Brute-force scanner over a two-byte command space, reporting commands
//! that make the device answer with something new.

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser};
use common::{ShutdownSignal, setup_logging};
use probe::cli::{ArgsError, DeviceArgs, GlobalArgs, warn_if_unprivileged};
use probe::config::parse_base;
use probe::driver::{ByteRange, ScanPlan, run_scan};
use probe::runner::run_interruptible;
use probe::usb::{RusbBackend, Session, discover_product};
use protocol::Frame;
use std::io;
use std::process::ExitCode;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "usb-sniff")]
#[command(author, about = "USB sniffer - scan a command space for device responses")]
#[command(long_about = "
Sends every candidate of a two-byte command space to the device, twice
each, and prints the candidates whose answer differs from the previous
one. Lost devices are re-acquired and the scan resumes at the next
candidate.

EXAMPLES:
    # Full 0e 00 xx yy sweep with the detected dialect
    usb-sniff -v 0x1b1c -p 0x1b2e

    # Reset first and sweep 07 02 xx yy with yy limited to 00-03
    usb-sniff -v 0x1b1c -p 0x1b2e -r --base '07 02' --second-range 00-03

    # Vary bytes 1 and 2 instead of 2 and 3
    usb-sniff -v 0x1b1c -p 0x1b2e --base 0e --position 1

CONFIGURATION:
    The scan plan defaults come from the [scan] section of, in order:
    1. Path specified with --config
    2. ~/.config/usb-probe/probe.toml
    3. /etc/usb-probe/probe.toml
    4. Built-in defaults
")]
struct Args {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(flatten)]
    device: DeviceArgs,

    /// Leading bytes of every candidate (space separated hex)
    #[arg(long, value_name = "HEX")]
    base: Option<String>,

    /// Position of the first varied byte
    #[arg(long, value_name = "N")]
    position: Option<usize>,

    /// Values of the first varied byte, e.g. 00-ff
    #[arg(long, value_name = "RANGE")]
    first_range: Option<ByteRange>,

    /// Values of the second varied byte, e.g. 00-03
    #[arg(long, value_name = "RANGE")]
    second_range: Option<ByteRange>,
}

impl Args {
    /// Configured plan with command line overrides applied
    fn scan_plan(&self, configured: ScanPlan) -> Result<ScanPlan> {
        let base = match &self.base {
            Some(base) => parse_base(base)?,
            None => configured.base,
        };
        let position = self.position.unwrap_or(configured.first_position);
        let plan = ScanPlan::new(base, position).map_err(|e| anyhow!(e))?;
        Ok(plan.with_ranges(
            self.first_range.unwrap_or(configured.first),
            self.second_range.unwrap_or(configured.second),
        ))
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    if args.global.save_config_requested()? {
        return Ok(ExitCode::SUCCESS);
    }

    let config = args.global.load_config()?;
    let log_level = args.device.log_level(&args.global, &config);
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("usb-sniff v{}", env!("CARGO_PKG_VERSION"));
    warn_if_unprivileged();

    let mut backend = RusbBackend::new().context("Failed to initialize libusb")?;
    let options = match args.device.session_options(
        &config,
        config.transfer.scan_timeout(),
        |vendor| discover_product(&mut backend, vendor),
    ) {
        Ok(options) => options,
        Err(e @ ArgsError::MissingId { .. }) => {
            eprintln!("{}\n", e);
            Args::command().print_help()?;
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };
    let plan = args
        .scan_plan(config.scan_plan()?)
        .context("Invalid scan plan")?;

    let mut session = match Session::open(backend, options) {
        Ok(session) => session,
        Err(e) => {
            error!("{}", e);
            if let Some(hint) = e.remediation() {
                eprintln!("{}", hint);
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    let reset = args.device.reset;
    let settle = config.transfer.reset_settle();
    let stop = ShutdownSignal::new();
    let driver_stop = stop.clone();

    let result = run_interruptible(
        stop,
        || {},
        move || -> Result<()> {
            if reset {
                eprintln!("Please don't touch your device.");
                session.reset_device(settle)?;
            }

            let mut stdout = io::stdout().lock();
            let report = run_scan(&mut session, &plan, &driver_stop, &mut stdout)?;
            eprintln!(
                "{} of {} candidates answered with something new",
                report.hits.len(),
                report.candidates
            );

            // Leave the device in a known state for the OS
            if reset && session.exchange(&Frame::reset()).error().is_some() {
                warn!("Final reset request failed");
            }
            Ok(())
        },
    )
    .await?;

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            error!("{:#}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
