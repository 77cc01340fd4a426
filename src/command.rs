//! Command/acknowledge channel.

use std::io::ErrorKind;
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::errors::{DriverError, Result};
use crate::protocol::{Command, ACK, DEFAULT_ACK_TIMEOUT};
use crate::transport::Transport;

/// Sends commands and waits for the device's `0xFF` acknowledgment.
///
/// The wait is a bounded poll: each read returns after the link's read
/// timeout, and once `ack_timeout` has passed without an ack the send fails
/// with [`DriverError::Timeout`]. Any byte other than `0xFF` is discarded.
#[derive(Debug, Clone)]
pub struct CommandChannel {
    ack_timeout: Duration,
    discarded: usize,
}

impl Default for CommandChannel {
    fn default() -> Self {
        Self::new(DEFAULT_ACK_TIMEOUT)
    }
}

impl CommandChannel {
    pub fn new(ack_timeout: Duration) -> Self {
        Self {
            ack_timeout,
            discarded: 0,
        }
    }

    /// Total number of non-ack bytes thrown away while waiting.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Encode `command`, send it, and wait for its acknowledgment.
    pub fn send(&mut self, link: &mut dyn Transport, command: Command) -> Result<()> {
        debug!("sending command: {}", command);
        self.send_and_await_ack(link, &command.to_bytes())
            .map_err(|e| match e {
                DriverError::Timeout(msg) => DriverError::Timeout(format!("{command}: {msg}")),
                other => other,
            })
    }

    /// Write `bytes` to the device, then read one byte at a time until `0xFF`.
    ///
    /// Bytes following the ack are left unread.
    pub fn send_and_await_ack(&mut self, link: &mut dyn Transport, bytes: &[u8]) -> Result<()> {
        link.write_all(bytes)?;
        link.flush()?;
        self.await_ack(link)
    }

    fn await_ack(&mut self, link: &mut dyn Transport) -> Result<()> {
        let deadline = Instant::now() + self.ack_timeout;
        let mut byte = [0u8; 1];

        loop {
            match link.read(&mut byte) {
                Ok(1) if byte[0] == ACK => {
                    trace!("ack received");
                    return Ok(());
                }
                Ok(1) => {
                    trace!("discarding non-ack byte 0x{:02x}", byte[0]);
                    self.discarded += 1;
                }
                Ok(_) => {
                    return Err(DriverError::Io(std::io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "device link closed while waiting for ack",
                    )));
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) => {}
                Err(e) => return Err(e.into()),
            }

            if Instant::now() >= deadline {
                return Err(DriverError::Timeout(format!(
                    "no ack (0x{ACK:02x}) within {:?}",
                    self.ack_timeout
                )));
            }
        }
    }
}
