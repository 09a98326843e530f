//! Running a blocking driver under the tokio runtime
//!
//! The USB driver blocks on transfers, so it runs on a blocking thread
//! while the runtime waits for Ctrl+C. An interrupt raises the stop signal
//! and the caller-supplied hook (used to close the line channel), then the
//! driver is awaited so that its session tears down before exit.

use anyhow::{Context, Result};
use common::ShutdownSignal;
use tokio::signal;
use tokio::task;
use tracing::{error, info};

/// Run `job` on a blocking thread until it returns or Ctrl+C arrives
pub async fn run_interruptible<T, F, H>(stop: ShutdownSignal, on_interrupt: H, job: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
    H: FnOnce(),
{
    let mut handle = task::spawn_blocking(job);

    tokio::select! {
        result = &mut handle => result.context("USB thread panicked"),
        interrupted = signal::ctrl_c() => {
            match interrupted {
                Ok(()) => info!("Received Ctrl+C, stopping after the current transfer..."),
                Err(e) => error!("Error waiting for Ctrl+C: {}", e),
            }
            stop.trigger();
            on_interrupt();
            handle.await.context("USB thread panicked")
        }
    }
}
