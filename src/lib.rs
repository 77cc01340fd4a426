//! Session driver for GSR+PPG wearable biosensors.
//!
//! The sensor is reached over a serial port (USB dock, or an RFCOMM device
//! bound with `rfcomm bind`) at 115200 baud. A session configures the board
//! through a command/ack handshake, then decodes the 8-byte frame stream
//! into calibrated skin resistance and PPG voltage samples.
//!
//! # Timing
//!
//! Each frame carries a 24-bit device clock counter, but samples are stamped
//! with the host wall clock at the moment the frame is decoded. Bluetooth
//! buffering means several frames can share nearly the same timestamp.

pub mod command;
pub mod convert;
pub mod errors;
pub mod experiment;
pub mod frame;
pub mod logging;
pub mod protocol;
pub mod session;
pub mod sink;
pub mod transport;

pub use command::CommandChannel;
pub use convert::{RangeTable, Sample, SampleConverter};
pub use errors::*;
pub use experiment::ExperimentSettings;
pub use frame::{Frame, FrameDecoder};
pub use protocol::{Command, SamplingRate};
pub use session::{Session, SessionConfig, SessionState, SessionSummary};
pub use sink::{CsvSink, SampleSink};
pub use transport::Transport;
