//! Session lifecycle: handshake, streaming loop and shutdown.
//!
//! A [`Session`] exclusively owns the device link and the frame buffer for
//! its whole lifetime:
//!
//! ```text
//! Idle -> Configuring -> Streaming -> Stopping -> Closed
//! ```
//!
//! Configuring clears stale input and sends select-sensors, internal power,
//! sampling rate and start, each gated on an ack. Streaming decodes frames
//! until the cancellation token fires. Stopping sends the stop command and
//! waits for its ack; Closed releases the port. The port is also released
//! when the session is dropped on an error path.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::command::CommandChannel;
use crate::convert::SampleConverter;
use crate::errors::{DriverError, Result};
use crate::frame::FrameDecoder;
use crate::protocol::{Command, SamplingRate, DEFAULT_ACK_TIMEOUT, DEFAULT_POLL_INTERVAL};
use crate::sink::SampleSink;
use crate::transport::{open_serial, Transport};

// ============================================================================
// Data Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Configuring,
    Streaming,
    Stopping,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Configuring => "configuring",
            SessionState::Streaming => "streaming",
            SessionState::Stopping => "stopping",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Tunables for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub sampling_rate: SamplingRate,
    /// Bound on each acknowledgment wait.
    pub ack_timeout: Duration,
    /// Serial read timeout; cancellation is observed at least this often.
    pub poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sampling_rate: SamplingRate::default(),
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// What a finished session did.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    /// Samples handed to the sink.
    pub samples: usize,
    /// Non-ack bytes skipped while waiting for acknowledgments.
    pub discarded_bytes: usize,
    /// Partial-frame bytes left in the buffer at shutdown.
    pub leftover_bytes: usize,
    pub state: SessionState,
}

// ============================================================================
// Session
// ============================================================================

/// One device session.
///
/// # Example
/// ```ignore
/// let cancel = CancellationToken::new();
/// let session = Session::open("/dev/rfcomm0", SessionConfig::default())?;
/// let mut sink = CsvSink::create("S1/GSR_PPG/S1_M25_forest_joystick.csv")?;
/// let summary = session.run(&mut sink, &cancel)?;
/// println!("{} samples", summary.samples);
/// ```
pub struct Session {
    link: Option<Box<dyn Transport>>,
    channel: CommandChannel,
    decoder: FrameDecoder,
    converter: SampleConverter,
    config: SessionConfig,
    state: SessionState,
    samples: usize,
}

impl Session {
    // ------------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------------

    /// Open the serial device at `port` (e.g. `/dev/rfcomm0`, `COM12`).
    ///
    /// An empty port name is a usage error and nothing is opened.
    pub fn open(port: &str, config: SessionConfig) -> Result<Self> {
        let serial = open_serial(port, config.poll_interval)?;
        info!("port {} opened", port.trim());
        Ok(Self::from_transport(serial, config))
    }

    /// Wrap an already-open link.
    pub fn from_transport<T: Transport + 'static>(link: T, config: SessionConfig) -> Self {
        Self {
            link: Some(Box::new(link)),
            channel: CommandChannel::new(config.ack_timeout),
            decoder: FrameDecoder::new(),
            converter: SampleConverter::default(),
            config,
            state: SessionState::Idle,
            samples: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Run the whole session, emitting samples into `sink` until `cancel`
    /// fires.
    ///
    /// Errors during configuration close the port and return immediately.
    /// Once streaming has begun the stop command is sent exactly once, even
    /// when the loop failed; in that case the loop's error is returned.
    pub fn run(
        mut self,
        sink: &mut dyn SampleSink,
        cancel: &CancellationToken,
    ) -> Result<SessionSummary> {
        self.configure()?;

        let streamed = self.stream(sink, cancel);
        let stopped = self.stop();
        let summary = self.close();

        match (streamed, stopped) {
            (Ok(_), Ok(())) => Ok(summary),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(stop_err)) => {
                warn!("stop after failed stream also failed: {}", stop_err);
                Err(e)
            }
        }
    }

    fn configure(&mut self) -> Result<()> {
        self.transition(SessionState::Configuring);
        let rate = self.config.sampling_rate;
        let link = self.link.as_deref_mut().ok_or_else(closed_link)?;

        link.clear_input()?;
        debug!("input buffer cleared");

        let commands = [
            Command::SelectSensors,
            Command::EnableInternalPower,
            Command::SetSamplingRate(rate),
            Command::StartStreaming,
        ];
        for command in commands {
            self.channel.send(link, command)?;
            info!("{}, done", command);
        }

        if rate.actual_hz() != f64::from(rate.hz()) {
            info!(
                "requested {} Hz, device runs at {:.3} Hz (clock_wait={})",
                rate.hz(),
                rate.actual_hz(),
                rate.clock_wait()
            );
        }

        self.transition(SessionState::Streaming);
        Ok(())
    }

    fn stream(&mut self, sink: &mut dyn SampleSink, cancel: &CancellationToken) -> Result<()> {
        sink.begin()?;
        let link = self.link.as_deref_mut().ok_or_else(closed_link)?;

        while !cancel.is_cancelled() {
            let Some(frame) = self.decoder.try_pull(link)? else {
                continue;
            };
            let sample = self.converter.convert(&frame, wall_clock_millis());
            debug!(
                "0x{:02x}\t{:.0},\t{:.1},\t{:.1}",
                frame.packet_type, sample.timestamp_millis, sample.gsr_ohm, sample.ppg_millivolts
            );
            sink.emit(&sample)?;
            self.samples += 1;
        }

        info!("cancellation received after {} samples", self.samples);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.transition(SessionState::Stopping);
        let link = self.link.as_deref_mut().ok_or_else(closed_link)?;

        info!("stop command sent, waiting for ack");
        self.channel.send(link, Command::StopStreaming)?;
        info!("stop acknowledged");
        Ok(())
    }

    fn close(&mut self) -> SessionSummary {
        if self.link.take().is_some() {
            info!("port closed");
        }
        self.transition(SessionState::Closed);

        SessionSummary {
            samples: self.samples,
            discarded_bytes: self.channel.discarded(),
            leftover_bytes: self.decoder.buffered(),
            state: self.state,
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!("session state: {} -> {}", self.state, next);
        self.state = next;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.link.take().is_some() {
            debug!("releasing port in state {}", self.state);
        }
    }
}

fn closed_link() -> DriverError {
    DriverError::Usage("session link already closed".into())
}

/// Milliseconds since the Unix epoch, with sub-millisecond precision.
fn wall_clock_millis() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}
