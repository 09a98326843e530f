//! usbsh
//!
//! Interactive shell for sending raw interrupt frames to a USB device and
//! reading its answers.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use common::{ShutdownSignal, create_line_bridge, setup_logging, spawn_stdin_reader};
use probe::cli::{ArgsError, DeviceArgs, GlobalArgs, warn_if_unprivileged};
use probe::driver::{ReplOptions, run_repl};
use probe::runner::run_interruptible;
use probe::usb::{RusbBackend, Session, discover_product};
use std::io::{self, BufReader};
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "usbsh")]
#[command(author, about = "USB shell - send raw interrupt frames interactively")]
#[command(long_about = "
Interactive shell for reverse-engineering vendor interrupt protocols.
Each input line is a decimal byte count followed by that many hex bytes.
The frame is zero-padded to 64 bytes, sent, and the answer is printed.
A count of 0 exits.

EXAMPLES:
    # Known vendor, dialect detected from the interface count
    usbsh -v 0x1b1c -p 0x1b2e

    # Known vendor, product taken from the first attached device
    usbsh -v 0x1b1c

    # Force protocol version 3 endpoints
    usbsh -v 0x1b1c -p 0x1b2e -3

    # Unknown vendor: endpoints must be given
    usbsh -v 0x046d -p 0xc52b -i 0x83 -o 0x04

    # Reset the device first, verbose prompt and frame dumps
    usbsh -v 0x1b1c -p 0x1b2e -r -V

INPUT:
    3 07 02 00      send 07 02 00 followed by 61 zero bytes
    0               quit

CONFIGURATION:
    Default IDs and timeouts are read from, in order:
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

    info!("usbsh v{}", env!("CARGO_PKG_VERSION"));
    warn_if_unprivileged();

    let mut backend = RusbBackend::new().context("Failed to initialize libusb")?;
    let options = match args.device.session_options(
        &config,
        config.transfer.repl_timeout(),
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
    let repl_options = ReplOptions {
        prompt: args.device.verbose,
    };

    let (sender, lines) = create_line_bridge();
    spawn_stdin_reader(BufReader::new(io::stdin()), sender)
        .context("Failed to start input reader")?;

    let stop = ShutdownSignal::new();
    let closer = lines.clone();
    let driver_stop = stop.clone();

    let result = run_interruptible(
        stop,
        move || {
            closer.close();
        },
        move || -> Result<()> {
            if reset {
                session.reset_device(settle)?;
            }
            let mut stdout = io::stdout().lock();
            run_repl(&mut session, lines, &mut stdout, &driver_stop, repl_options)?;
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
