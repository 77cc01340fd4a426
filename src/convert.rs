//! Calibration of raw frame values into physical units.
//!
//! GSR is measured through an auto-ranging feedback resistor: the top two
//! bits of the raw value select `Rf`, the low 14 bits are the ADC reading.
//! Skin resistance is then `Rf / (V / 0.5 - 1)`. The formula is applied
//! verbatim, so readings at or below 0.5 V yield infinite or negative values.

use serde::Serialize;

use crate::frame::Frame;

/// Full-scale voltage of the device ADC.
const ADC_REFERENCE_VOLTS: f64 = 3.0;
/// Largest 12-bit ADC count.
const ADC_MAX: f64 = 4095.0;
/// Reference voltage of the GSR front end.
const GSR_BIAS_VOLTS: f64 = 0.5;

const GSR_RANGE_SHIFT: u16 = 14;
const GSR_MAGNITUDE_MASK: u16 = 0x3FFF;

/// Feedback resistor values (kΩ) indexed by the 2-bit range code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeTable {
    rf_kohm: [f64; 4],
}

impl Default for RangeTable {
    fn default() -> Self {
        Self {
            rf_kohm: [40.2, 287.0, 1000.0, 3300.0],
        }
    }
}

impl RangeTable {
    /// Range code carried in bits 14-15 of the raw GSR value.
    pub fn range_code(gsr_raw: u16) -> u8 {
        ((gsr_raw >> GSR_RANGE_SHIFT) & 0x3) as u8
    }

    /// Feedback resistance in kΩ for a range code.
    pub fn feedback_kohm(&self, range_code: u8) -> f64 {
        self.rf_kohm[usize::from(range_code & 0x3)]
    }
}

/// One calibrated reading, serialized as a `Timestamp,GSR,PPG` row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    /// Wall-clock capture time, milliseconds since the Unix epoch.
    #[serde(rename = "Timestamp")]
    pub timestamp_millis: f64,
    #[serde(rename = "GSR")]
    pub gsr_ohm: f64,
    #[serde(rename = "PPG")]
    pub ppg_millivolts: f64,
}

/// Converts frames into [`Sample`]s.
#[derive(Debug, Clone, Default)]
pub struct SampleConverter {
    ranges: RangeTable,
}

impl SampleConverter {
    /// Calibrate `frame`, stamping it with `capture_time_millis`.
    ///
    /// The frame's own device timestamp is ignored.
    pub fn convert(&self, frame: &Frame, capture_time_millis: f64) -> Sample {
        let rf = self.ranges.feedback_kohm(RangeTable::range_code(frame.gsr_raw));
        let volts = f64::from(frame.gsr_raw & GSR_MAGNITUDE_MASK) * (ADC_REFERENCE_VOLTS / ADC_MAX);

        Sample {
            timestamp_millis: capture_time_millis,
            gsr_ohm: rf / ((volts / GSR_BIAS_VOLTS) - 1.0),
            ppg_millivolts: f64::from(frame.ppg_raw) * (ADC_REFERENCE_VOLTS * 1000.0 / ADC_MAX),
        }
    }
}
