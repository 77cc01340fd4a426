//! Simulated sensor shared by the integration tests.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::sync::{Arc, Mutex};

use shimmer_gsr::protocol::ACK;
use shimmer_gsr::{Frame, Transport};
use tokio_util::sync::CancellationToken;

/// What the simulated device saw and did, readable after the session has
/// taken ownership of the link.
#[derive(Debug, Default)]
pub struct DeviceLog {
    /// Every command the host wrote, one entry per write.
    pub commands: Vec<Vec<u8>>,
    /// Bytes still queued towards the host.
    pub outgoing: VecDeque<u8>,
    /// Set when a command arrived while stale input was still queued.
    pub unflushed_command: bool,
    /// Set once the session releases the link.
    pub closed: bool,
}

/// Device that acks every command, streams `frames` after the start command
/// and cancels `cancel` once the host has read them all.
#[allow(dead_code)]
pub struct SimulatedDevice {
    log: Arc<Mutex<DeviceLog>>,
    frames: Vec<u8>,
    /// Bytes handed out per read, to exercise frame reassembly.
    chunk: usize,
    /// Non-ack bytes sent before each ack.
    noise: Vec<u8>,
    streaming: bool,
    cancel: CancellationToken,
}

#[allow(dead_code)]
impl SimulatedDevice {
    pub fn new(frames: &[Frame], cancel: CancellationToken) -> (Self, Arc<Mutex<DeviceLog>>) {
        let log = Arc::new(Mutex::new(DeviceLog::default()));
        let device = Self {
            log: log.clone(),
            frames: frames.iter().flat_map(|f| f.to_bytes()).collect(),
            chunk: 8,
            noise: Vec::new(),
            streaming: false,
            cancel,
        };
        (device, log)
    }

    pub fn with_chunk(mut self, chunk: usize) -> Self {
        self.chunk = chunk.max(1);
        self
    }

    pub fn with_noise(mut self, noise: &[u8]) -> Self {
        self.noise = noise.to_vec();
        self
    }

    /// Queue bytes as if left over from an earlier connection.
    pub fn with_stale_input(self, stale: &[u8]) -> Self {
        self.log.lock().unwrap().outgoing.extend(stale);
        self
    }

    /// Append raw bytes to the frame stream (e.g. a trailing partial frame).
    pub fn with_trailing(mut self, bytes: &[u8]) -> Self {
        self.frames.extend_from_slice(bytes);
        self
    }
}

impl Read for SimulatedDevice {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut log = self.log.lock().unwrap();
        if log.outgoing.is_empty() {
            if self.streaming {
                self.cancel.cancel();
            }
            return Err(ErrorKind::TimedOut.into());
        }
        let n = buf.len().min(self.chunk).min(log.outgoing.len());
        for slot in buf.iter_mut().take(n) {
            *slot = log.outgoing.pop_front().unwrap();
        }
        Ok(n)
    }
}

impl Write for SimulatedDevice {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut log = self.log.lock().unwrap();
        if log.commands.is_empty() && !log.outgoing.is_empty() {
            log.unflushed_command = true;
        }
        log.commands.push(buf.to_vec());
        log.outgoing.extend(self.noise.iter().copied());
        log.outgoing.push_back(ACK);
        match buf.first() {
            Some(0x07) => {
                log.outgoing.extend(self.frames.iter().copied());
                self.streaming = true;
            }
            Some(0x20) => self.streaming = false,
            _ => {}
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Transport for SimulatedDevice {}

impl Drop for SimulatedDevice {
    fn drop(&mut self) {
        self.log.lock().unwrap().closed = true;
    }
}

#[allow(dead_code)]
pub fn frame(device_timestamp: u32, ppg_raw: u16, gsr_raw: u16) -> Frame {
    Frame {
        packet_type: 0x00,
        device_timestamp,
        ppg_raw,
        gsr_raw,
    }
}
