//! Destinations for calibrated samples.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use log::debug;

use crate::convert::Sample;
use crate::errors::{DriverError, Result};

/// Column names of the sample log, in order.
pub const HEADER: [&str; 3] = ["Timestamp", "GSR", "PPG"];

/// Append-only consumer of samples.
pub trait SampleSink {
    /// Called once, before the first sample of a session.
    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn emit(&mut self, sample: &Sample) -> Result<()>;
}

impl SampleSink for Vec<Sample> {
    fn emit(&mut self, sample: &Sample) -> Result<()> {
        self.push(*sample);
        Ok(())
    }
}

/// CSV log with a `Timestamp,GSR,PPG` header. Each row is flushed as soon as
/// it is written so an interrupted session keeps everything captured so far.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl CsvSink<File> {
    /// Create (truncating) the log file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("creating sample log: {}", path.display());
        Ok(Self::from_writer(File::create(path)?))
    }
}

impl<W: Write> CsvSink<W> {
    pub fn from_writer(inner: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        Self { writer, rows: 0 }
    }

    /// Number of sample rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| DriverError::Io(e.into_error()))
    }
}

impl<W: Write> SampleSink for CsvSink<W> {
    fn begin(&mut self) -> Result<()> {
        self.writer.write_record(HEADER)?;
        self.writer.flush()?;
        Ok(())
    }

    fn emit(&mut self, sample: &Sample) -> Result<()> {
        self.writer.serialize(sample)?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_once_then_rows() {
        let mut sink = CsvSink::from_writer(Vec::new());
        sink.begin().unwrap();
        sink.emit(&Sample {
            timestamp_millis: 1500.5,
            gsr_ohm: -40.2,
            ppg_millivolts: 3000.0,
        })
        .unwrap();
        sink.emit(&Sample {
            timestamp_millis: 1501.0,
            gsr_ohm: 143.5,
            ppg_millivolts: 0.0,
        })
        .unwrap();
        assert_eq!(sink.rows(), 2);

        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Timestamp,GSR,PPG");
        assert_eq!(lines[1], "1500.5,-40.2,3000.0");
        assert_eq!(lines[2], "1501.0,143.5,0.0");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn vec_sink_collects_samples() {
        let mut sink: Vec<Sample> = Vec::new();
        sink.begin().unwrap();
        let sample = Sample {
            timestamp_millis: 1.0,
            gsr_ohm: 2.0,
            ppg_millivolts: 3.0,
        };
        sink.emit(&sample).unwrap();
        assert_eq!(sink, vec![sample]);
    }
}
