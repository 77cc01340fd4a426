//! Streamed data frames and the accumulation buffer that slices them.
//!
//! Frame layout (device → host), little-endian fields:
//!
//! ```text
//! byte  0      packet type
//! bytes 1..4   device timestamp (24-bit counter)
//! bytes 4..6   PPG raw ADC value (internal ADC A13)
//! bytes 6..8   GSR raw value (bits 14-15 range code, bits 0-13 magnitude)
//! ```
//!
//! The format carries no checksum, so a corrupted frame decodes as-is.

use std::io::ErrorKind;

use log::trace;

use crate::errors::{DriverError, Result};
use crate::protocol::FRAME_SIZE;
use crate::transport::Transport;

/// One decoded 8-byte data frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub packet_type: u8,
    /// Device clock ticks. Decoded but not used for sample timing.
    pub device_timestamp: u32,
    pub ppg_raw: u16,
    pub gsr_raw: u16,
}

impl Frame {
    /// Decode a frame from exactly [`FRAME_SIZE`] bytes.
    pub fn from_bytes(bytes: &[u8; FRAME_SIZE]) -> Self {
        Self {
            packet_type: bytes[0],
            device_timestamp: u32::from_le_bytes([bytes[1], bytes[2], bytes[3], 0]),
            ppg_raw: u16::from_le_bytes([bytes[4], bytes[5]]),
            gsr_raw: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }

    /// Encode back into wire order. Used to build synthetic device streams.
    pub fn to_bytes(&self) -> [u8; FRAME_SIZE] {
        let ts = self.device_timestamp.to_le_bytes();
        let ppg = self.ppg_raw.to_le_bytes();
        let gsr = self.gsr_raw.to_le_bytes();
        [
            self.packet_type,
            ts[0],
            ts[1],
            ts[2],
            ppg[0],
            ppg[1],
            gsr[0],
            gsr[1],
        ]
    }
}

/// Accumulates raw bytes from the link and hands out one frame per call.
///
/// Bytes beyond the first complete frame stay buffered for the next call, so
/// frames split across reads are reassembled in order.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(FRAME_SIZE * 2),
        }
    }

    /// Number of bytes held over from previous reads.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Append bytes as if they had been read from the link.
    #[cfg(test)]
    fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Block until a complete frame is available and return it.
    ///
    /// Read timeouts on the link are retried; only real I/O errors fail.
    pub fn pull(&mut self, link: &mut dyn Transport) -> Result<Frame> {
        loop {
            if let Some(frame) = self.try_pull(link)? {
                return Ok(frame);
            }
        }
    }

    /// Return a frame if one is buffered or completed by a single read.
    ///
    /// Returns `Ok(None)` when the read timed out before a full frame was
    /// available; the partial bytes are kept.
    pub fn try_pull(&mut self, link: &mut dyn Transport) -> Result<Option<Frame>> {
        if let Some(frame) = self.take_frame() {
            return Ok(Some(frame));
        }

        let mut chunk = [0u8; FRAME_SIZE];
        match link.read(&mut chunk) {
            Ok(0) => {
                return Err(DriverError::Io(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "device link closed mid-stream",
                )))
            }
            Ok(n) => {
                trace!("read {} bytes ({} buffered)", n, self.buffer.len());
                self.buffer.extend_from_slice(&chunk[..n]);
            }
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        }

        Ok(self.take_frame())
    }

    /// Slice the first frame off the buffer, if there is one.
    fn take_frame(&mut self) -> Option<Frame> {
        if self.buffer.len() < FRAME_SIZE {
            return None;
        }
        let mut bytes = [0u8; FRAME_SIZE];
        bytes.copy_from_slice(&self.buffer[..FRAME_SIZE]);
        self.buffer.drain(..FRAME_SIZE);
        Some(Frame::from_bytes(&bytes))
    }
}
