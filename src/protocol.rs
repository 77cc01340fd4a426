//! Wire-level constants and command encoding for the GSR+ expansion board.
//!
//! Every host → device command is a short byte sequence answered by a single
//! `0xFF` acknowledgment byte. Once streaming starts the device sends fixed
//! 8-byte data frames (see [`crate::frame`]).

use std::fmt;
use std::time::Duration;

use crate::errors::{DriverError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Serial baud rate used by the device.
pub const BAUD_RATE: u32 = 115_200;

/// Byte the device sends back after accepting a command.
pub const ACK: u8 = 0xFF;

/// Size in bytes of one streamed data frame.
pub const FRAME_SIZE: usize = 8;

/// Frequency of the device's sampling clock; `clock_wait = CLOCK_HZ / f`.
pub const CLOCK_HZ: u32 = 32_768;

/// Default sampling frequency in Hz.
pub const DEFAULT_SAMPLING_HZ: u32 = 128;

/// Default bound on how long to wait for a command acknowledgment.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Default serial read timeout, which doubles as the poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

const CMD_SET_SENSORS: u8 = 0x08;
const CMD_SET_INTERNAL_POWER: u8 = 0x5E;
const CMD_SET_SAMPLING_RATE: u8 = 0x05;
const CMD_START_STREAMING: u8 = 0x07;
const CMD_STOP_STREAMING: u8 = 0x20;

// Sensor bitmap bytes for GSR + internal ADC A13 (PPG).
const SENSORS_GSR_PPG: [u8; 3] = [0x04, 0x01, 0x00];

// ============================================================================
// Sampling Rate
// ============================================================================

/// Desired sampling frequency, validated against what the clock divider can
/// express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingRate {
    hz: u32,
}

impl Default for SamplingRate {
    fn default() -> Self {
        Self {
            hz: DEFAULT_SAMPLING_HZ,
        }
    }
}

impl SamplingRate {
    /// Parse a frequency in Hz, returning a usage error outside `1..=32768`.
    pub fn from_hz_checked(hz: u32) -> Result<Self> {
        if hz == 0 || hz > CLOCK_HZ {
            return Err(DriverError::Usage(format!(
                "invalid sampling rate {hz} Hz (supported: 1..={CLOCK_HZ})"
            )));
        }
        Ok(Self { hz })
    }

    /// Requested frequency in Hz.
    pub fn hz(self) -> u32 {
        self.hz
    }

    /// Clock divider sent in the set-rate command (integer division).
    pub fn clock_wait(self) -> u16 {
        // hz >= 1 keeps this at most 32768, which fits in u16.
        (CLOCK_HZ / self.hz) as u16
    }

    /// Frequency the device will actually run at after integer division.
    pub fn actual_hz(self) -> f64 {
        CLOCK_HZ as f64 / self.clock_wait() as f64
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Commands the host sends during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Enable the GSR and PPG channels.
    SelectSensors,
    /// Power the internal expansion board.
    EnableInternalPower,
    /// Program the sampling clock divider.
    SetSamplingRate(SamplingRate),
    StartStreaming,
    StopStreaming,
}

impl Command {
    /// Encode the command as it goes over the wire.
    pub fn to_bytes(self) -> Vec<u8> {
        match self {
            Command::SelectSensors => {
                let mut bytes = vec![CMD_SET_SENSORS];
                bytes.extend_from_slice(&SENSORS_GSR_PPG);
                bytes
            }
            Command::EnableInternalPower => vec![CMD_SET_INTERNAL_POWER, 0x01],
            Command::SetSamplingRate(rate) => {
                let [lo, hi] = rate.clock_wait().to_le_bytes();
                vec![CMD_SET_SAMPLING_RATE, lo, hi]
            }
            Command::StartStreaming => vec![CMD_START_STREAMING],
            Command::StopStreaming => vec![CMD_STOP_STREAMING],
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SelectSensors => f.write_str("select sensors (GSR+PPG)"),
            Command::EnableInternalPower => f.write_str("enable internal power"),
            Command::SetSamplingRate(rate) => write!(
                f,
                "set sampling rate ({} Hz, clock_wait={})",
                rate.hz(),
                rate.clock_wait()
            ),
            Command::StartStreaming => f.write_str("start streaming"),
            Command::StopStreaming => f.write_str("stop streaming"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rate_encodes_clock_wait_256_little_endian() {
        let rate = SamplingRate::default();
        assert_eq!(rate.hz(), 128);
        assert_eq!(rate.clock_wait(), 256);
        assert_eq!(
            Command::SetSamplingRate(rate).to_bytes(),
            vec![0x05, 0x00, 0x01]
        );
    }

    #[test]
    fn clock_wait_uses_integer_division() {
        let rate = SamplingRate::from_hz_checked(100).unwrap();
        assert_eq!(rate.clock_wait(), 327);
        assert!((rate.actual_hz() - 32768.0 / 327.0).abs() < 1e-9);

        let slowest = SamplingRate::from_hz_checked(1).unwrap();
        assert_eq!(slowest.clock_wait(), 32768);
    }

    #[test]
    fn out_of_range_rates_are_usage_errors() {
        assert!(matches!(
            SamplingRate::from_hz_checked(0),
            Err(DriverError::Usage(_))
        ));
        assert!(matches!(
            SamplingRate::from_hz_checked(40_000),
            Err(DriverError::Usage(_))
        ));
    }

    #[test]
    fn command_opcodes() {
        assert_eq!(Command::SelectSensors.to_bytes(), vec![0x08, 0x04, 0x01, 0x00]);
        assert_eq!(Command::EnableInternalPower.to_bytes(), vec![0x5E, 0x01]);
        assert_eq!(Command::StartStreaming.to_bytes(), vec![0x07]);
        assert_eq!(Command::StopStreaming.to_bytes(), vec![0x20]);
    }
}
