//! Device link abstraction.
//!
//! The session only needs a byte pipe it can read, write and purge. Serial
//! ports (including RFCOMM devices bound with `rfcomm bind`) are opened
//! through `serialport`; tests plug in scripted in-memory links.

use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use log::debug;
use serialport::{ClearBuffer, SerialPort};

use crate::errors::{DriverError, Result};
use crate::protocol::BAUD_RATE;

/// Upper bound on how long [`Transport::clear_input`] drains by reading.
const MAX_DRAIN: Duration = Duration::from_millis(200);

/// Bidirectional byte link to the device.
///
/// Reads are expected to honor a finite timeout and report it as
/// `ErrorKind::TimedOut` (or `WouldBlock`), which callers treat as a poll tick.
pub trait Transport: Read + Write + Send {
    /// Discard any bytes already waiting on the input side.
    ///
    /// The default drains by reading until the link goes quiet.
    fn clear_input(&mut self) -> Result<()> {
        let mut buf = [0u8; 256];
        let start = Instant::now();
        let mut iterations = 0usize;
        loop {
            iterations += 1;
            match self.read(&mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::TimedOut => break,
                Err(e) => return Err(e.into()),
            }

            if iterations > 64 || start.elapsed() > MAX_DRAIN {
                break;
            }
        }
        Ok(())
    }
}

impl Transport for Box<dyn SerialPort> {
    fn clear_input(&mut self) -> Result<()> {
        self.clear(ClearBuffer::Input)?;
        Ok(())
    }
}

/// Open the serial device at `path` (e.g. `/dev/rfcomm0` or `COM12`).
///
/// `poll_interval` becomes the port's read timeout, so every blocking read
/// returns at least that often.
pub fn open_serial(path: &str, poll_interval: Duration) -> Result<Box<dyn SerialPort>> {
    let path = path.trim();
    if path.is_empty() {
        return Err(DriverError::Usage(
            "no device specified; pass the serial port of the sensor (e.g. /dev/rfcomm0 or COM12)"
                .into(),
        ));
    }

    debug!("opening serial port: path={}, baud={}", path, BAUD_RATE);
    let port = serialport::new(path, BAUD_RATE)
        .timeout(poll_interval)
        .open()?;
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_port_name_is_rejected_before_opening() {
        let err = open_serial("   ", Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, DriverError::Usage(_)));
    }

    struct Chatty {
        pending: Vec<u8>,
    }

    impl Read for Chatty {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pending.is_empty() {
                return Err(ErrorKind::TimedOut.into());
            }
            let n = buf.len().min(self.pending.len());
            buf[..n].copy_from_slice(&self.pending[..n]);
            self.pending.drain(..n);
            Ok(n)
        }
    }

    impl Write for Chatty {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Transport for Chatty {}

    #[test]
    fn default_clear_input_drains_until_timeout() {
        let mut link = Chatty {
            pending: vec![0xAB; 600],
        };
        link.clear_input().unwrap();
        assert!(link.pending.is_empty());
    }
}
