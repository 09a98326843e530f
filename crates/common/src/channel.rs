//! Line bridge between standard input and the USB thread
//!
//! Standard input is read on its own thread so that an operator interrupt
//! can end the interactive shell even while no line is pending: closing the
//! channel wakes the blocked receiver.

use async_channel::{Receiver, Sender, bounded};
use std::io::BufRead;
use tracing::debug;

/// Capacity of the line channel
const LINE_CHANNEL_CAPACITY: usize = 16;

/// Sending side, owned by the reader thread
#[derive(Debug, Clone)]
pub struct LineSender {
    tx: Sender<String>,
}

impl LineSender {
    /// Send a line, blocking while the channel is full
    ///
    /// Returns an error once the receiving side has been closed.
    pub fn send_blocking(&self, line: String) -> crate::Result<()> {
        self.tx
            .send_blocking(line)
            .map_err(|e| crate::Error::Channel(format!("Line channel closed: {}", e)))
    }
}

/// Receiving side, consumed by the interactive driver as an iterator
#[derive(Debug, Clone)]
pub struct LineReceiver {
    rx: Receiver<String>,
}

impl LineReceiver {
    /// Close the channel; pending and future receives return `None`
    pub fn close(&self) -> bool {
        self.rx.close()
    }

    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }
}

impl Iterator for LineReceiver {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.rx.recv_blocking().ok()
    }
}

/// Create a bounded line bridge
pub fn create_line_bridge() -> (LineSender, LineReceiver) {
    let (tx, rx) = bounded(LINE_CHANNEL_CAPACITY);
    (LineSender { tx }, LineReceiver { rx })
}

/// Forward lines from `input` into the bridge on a dedicated thread
///
/// The thread ends at end of input, on a read error, or once the receiver
/// is closed. Dropping the sender at the end closes the channel, so the
/// receiver observes end of input as `None`.
pub fn spawn_stdin_reader<R>(
    input: R,
    sender: LineSender,
) -> std::io::Result<std::thread::JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in input.lines() {
                match line {
                    Ok(line) => {
                        if sender.send_blocking(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!("Stopped reading input: {}", e);
                        break;
                    }
                }
            }
            debug!("Input reader finished");
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reader_forwards_lines_then_ends() {
        let (sender, receiver) = create_line_bridge();
        let input = Cursor::new("3 07 02 00\n0\n".as_bytes().to_vec());

        let handle = spawn_stdin_reader(input, sender).unwrap();
        let lines: Vec<String> = receiver.collect();
        handle.join().unwrap();

        assert_eq!(lines, vec!["3 07 02 00".to_string(), "0".to_string()]);
    }

    #[test]
    fn test_close_ends_iteration() {
        let (sender, mut receiver) = create_line_bridge();
        assert!(receiver.close());
        assert!(receiver.is_closed());
        assert!(receiver.next().is_none());
        assert!(sender.send_blocking("1 00".to_string()).is_err());
    }
}
