use serde::{Deserialize, Serialize};

use crate::data::columns;

/// A single voltage sample at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveformPoint {
    pub time: f64,
    pub voltage: f64,
}

impl WaveformPoint {
    pub fn new(time: f64, voltage: f64) -> Self {
        Self { time, voltage }
    }
}

/// Descriptive data carried alongside the samples of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMetadata {
    pub source_filename: String,
    pub sample_count: usize,
    /// Label of the scaled time axis, e.g. `ms` for seconds x 1000.
    pub time_unit: String,
    /// Unit of the time values as written in the file, before scaling.
    pub base_time_unit: String,
    pub voltage_unit: String,
    pub scale_factor: f64,
    /// Sample rate declared by the file preamble, in samples per second of
    /// the unscaled time axis.
    pub sample_rate_hz: Option<f64>,
}

/// A cleaned waveform: points sorted by strictly increasing time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformSeries {
    pub points: Vec<WaveformPoint>,
    pub metadata: SeriesMetadata,
}

impl WaveformSeries {
    pub fn new(points: Vec<WaveformPoint>, metadata: SeriesMetadata) -> Self {
        let mut metadata = metadata;
        metadata.sample_count = points.len();
        Self { points, metadata }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.time).collect()
    }

    pub fn voltages(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.voltage).collect()
    }

    /// Median spacing between consecutive samples.
    pub fn median_step(&self) -> Option<f64> {
        let mut steps: Vec<f64> = self
            .points
            .windows(2)
            .map(|w| w[1].time - w[0].time)
            .filter(|d| d.is_finite() && *d > 0.0)
            .collect();
        if steps.is_empty() {
            return None;
        }
        steps.sort_by(|a, b| a.total_cmp(b));
        Some(steps[steps.len() / 2])
    }

    /// Sample rate in samples per unit of the unscaled time axis.
    ///
    /// A rate declared in the file is preferred. Otherwise it is derived from
    /// the median step, undoing the scale factor and converting the file's
    /// time unit to seconds, so filter cutoffs are always in Hz. Units that
    /// are not a power of 1000 of a second are taken as seconds.
    pub fn sample_rate_hz(&self) -> Option<f64> {
        match self.metadata.sample_rate_hz {
            Some(rate) if rate > 0.0 => Some(rate),
            _ => {
                let seconds = columns::seconds_per_unit(&self.metadata.base_time_unit).unwrap_or(1.0);
                self.median_step()
                    .map(|step| self.metadata.scale_factor / (step * seconds))
            }
        }
    }

    pub fn axis_label_time(&self) -> String {
        format!("Time ({})", self.metadata.time_unit)
    }

    pub fn axis_label_voltage(&self) -> String {
        format!("Voltage ({})", self.metadata.voltage_unit)
    }
}
