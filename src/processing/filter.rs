use std::f64::consts::PI;

use crate::error::AnalysisError;
use crate::state::waveform::{WaveformPoint, WaveformSeries};

#[derive(Clone, Copy, Debug, PartialEq)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    fn lowpass(cutoff_hz: f64, sample_rate_hz: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * cutoff_hz / sample_rate_hz;
        let alpha = w0.sin() / (2.0 * q);
        let cos_w0 = w0.cos();
        let a0 = 1.0 + alpha;
        let b0 = (1.0 - cos_w0) * 0.5;
        Self {
            b0: b0 / a0,
            b1: (1.0 - cos_w0) / a0,
            b2: b0 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
        }
    }
}

/// Transposed direct form II section.
#[derive(Clone, Copy, Debug)]
struct Biquad {
    coeffs: BiquadCoeffs,
    z1: f64,
    z2: f64,
}

impl Biquad {
    fn new(coeffs: BiquadCoeffs) -> Self {
        Self { coeffs, z1: 0.0, z2: 0.0 }
    }

    /// Put the section in the steady state for a constant input `x0`, so a
    /// signal starting at `x0` produces no start-up transient.
    fn settle(&mut self, x0: f64) {
        self.z1 = (1.0 - self.coeffs.b0) * x0;
        self.z2 = (self.coeffs.b2 - self.coeffs.a2) * x0;
    }

    fn process(&mut self, input: f64) -> f64 {
        let c = self.coeffs;
        let y = c.b0 * input + self.z1;
        self.z1 = c.b1 * input - c.a1 * y + self.z2;
        self.z2 = c.b2 * input - c.a2 * y;
        y
    }
}

/// Butterworth low-pass filter built from cascaded biquads.
#[derive(Clone, Debug)]
pub struct LowPassFilter {
    sections: Vec<BiquadCoeffs>,
    order: usize,
}

impl LowPassFilter {
    /// Design an even-order Butterworth low-pass.
    pub fn butterworth(order: usize, cutoff_hz: f64, sample_rate_hz: f64) -> Result<Self, AnalysisError> {
        if !sample_rate_hz.is_finite() || sample_rate_hz <= 0.0 {
            return Err(AnalysisError::UnknownSampleRate);
        }
        if order == 0 || order % 2 != 0 {
            return Err(AnalysisError::InvalidOrder(order));
        }
        let nyquist_hz = sample_rate_hz * 0.5;
        if !cutoff_hz.is_finite() || cutoff_hz <= 0.0 || cutoff_hz >= nyquist_hz {
            return Err(AnalysisError::InvalidCutoff { cutoff_hz, nyquist_hz });
        }

        // Pole pairs of an order-N Butterworth sit at angles (2k+1)pi/2N.
        let sections = (0..order / 2)
            .map(|k| {
                let theta = (2 * k + 1) as f64 * PI / (2 * order) as f64;
                let q = 1.0 / (2.0 * theta.cos());
                BiquadCoeffs::lowpass(cutoff_hz, sample_rate_hz, q)
            })
            .collect();

        Ok(Self { sections, order })
    }

    /// Samples of odd reflection added at each end before filtering.
    pub fn pad_len(&self) -> usize {
        3 * (self.order + 1)
    }

    fn run(&self, data: &[f64]) -> Vec<f64> {
        let Some(&x0) = data.first() else {
            return Vec::new();
        };
        let mut chain: Vec<Biquad> = self.sections.iter().map(|c| Biquad::new(*c)).collect();
        for section in &mut chain {
            section.settle(x0);
        }
        data.iter()
            .map(|&x| chain.iter_mut().fold(x, |v, s| s.process(v)))
            .collect()
    }

    /// Zero-phase filtering: run forward, then backward over the result.
    pub fn filtfilt(&self, data: &[f64]) -> Result<Vec<f64>, AnalysisError> {
        let pad = self.pad_len();
        if data.len() <= pad {
            return Err(AnalysisError::TooFewSamples {
                needed: pad + 1,
                actual: data.len(),
            });
        }

        let first = data[0];
        let last = data[data.len() - 1];
        let mut padded = Vec::with_capacity(data.len() + 2 * pad);
        padded.extend((1..=pad).rev().map(|i| 2.0 * first - data[i]));
        padded.extend_from_slice(data);
        padded.extend((1..=pad).map(|i| 2.0 * last - data[data.len() - 1 - i]));

        let mut forward = self.run(&padded);
        forward.reverse();
        let mut backward = self.run(&forward);
        backward.reverse();

        Ok(backward[pad..pad + data.len()].to_vec())
    }
}

/// Low-pass filter the voltages of a series, keeping its time axis.
///
/// `cutoff_hz` is in cycles per unit of the file's own time axis.
pub fn lowpass_series(series: &WaveformSeries, cutoff_hz: f64, order: usize) -> Result<WaveformSeries, AnalysisError> {
    let rate = series.sample_rate_hz().ok_or(AnalysisError::UnknownSampleRate)?;
    let filter = LowPassFilter::butterworth(order, cutoff_hz, rate)?;
    let filtered = filter.filtfilt(&series.voltages())?;

    tracing::debug!(
        "Low-pass filtered {} samples (order {}, cutoff {} Hz, rate {} Hz)",
        filtered.len(),
        order,
        cutoff_hz,
        rate
    );

    let points = series
        .points
        .iter()
        .zip(filtered)
        .map(|(p, v)| WaveformPoint::new(p.time, v))
        .collect();
    Ok(WaveformSeries::new(points, series.metadata.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::waveform::SeriesMetadata;

    fn tone(freq_hz: f64, rate: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq_hz * i as f64 / rate).sin())
            .collect()
    }

    fn rms(values: &[f64]) -> f64 {
        (values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64).sqrt()
    }

    #[test]
    fn test_design_validation() {
        assert_eq!(
            LowPassFilter::butterworth(4, 600.0, 1000.0).unwrap_err(),
            AnalysisError::InvalidCutoff { cutoff_hz: 600.0, nyquist_hz: 500.0 }
        );
        assert!(matches!(
            LowPassFilter::butterworth(4, 0.0, 1000.0),
            Err(AnalysisError::InvalidCutoff { .. })
        ));
        assert_eq!(
            LowPassFilter::butterworth(3, 50.0, 1000.0).unwrap_err(),
            AnalysisError::InvalidOrder(3)
        );
        assert_eq!(
            LowPassFilter::butterworth(4, 50.0, 0.0).unwrap_err(),
            AnalysisError::UnknownSampleRate
        );
    }

    #[test]
    fn test_unity_dc_gain_per_section() {
        let filter = LowPassFilter::butterworth(4, 50.0, 1000.0).unwrap();
        for c in &filter.sections {
            let gain = (c.b0 + c.b1 + c.b2) / (1.0 + c.a1 + c.a2);
            assert!((gain - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_dc_signal_is_unchanged() {
        let filter = LowPassFilter::butterworth(4, 50.0, 1000.0).unwrap();
        let out = filter.filtfilt(&vec![2.5; 200]).unwrap();
        assert_eq!(out.len(), 200);
        assert!(out.iter().all(|v| (v - 2.5).abs() < 1e-9));
    }

    #[test]
    fn test_high_tone_is_attenuated_low_tone_passes() {
        let rate = 1000.0;
        let filter = LowPassFilter::butterworth(4, 10.0, rate).unwrap();

        let high = filter.filtfilt(&tone(200.0, rate, 4000)).unwrap();
        assert!(rms(&high[1000..3000]) < 1e-3);

        let low_in = tone(1.0, rate, 4000);
        let low = filter.filtfilt(&low_in).unwrap();
        let ratio = rms(&low[1000..3000]) / rms(&low_in[1000..3000]);
        assert!((ratio - 1.0).abs() < 0.01, "ratio {ratio}");
    }

    #[test]
    fn test_too_few_samples() {
        let filter = LowPassFilter::butterworth(4, 10.0, 1000.0).unwrap();
        assert_eq!(
            filter.filtfilt(&[1.0; 15]).unwrap_err(),
            AnalysisError::TooFewSamples { needed: 16, actual: 15 }
        );
        assert_eq!(filter.filtfilt(&[1.0; 16]).unwrap().len(), 16);
    }

    #[test]
    fn test_lowpass_series_keeps_time_axis() {
        let rate = 1000.0;
        let points: Vec<WaveformPoint> = tone(200.0, rate, 500)
            .into_iter()
            .enumerate()
            .map(|(i, v)| WaveformPoint::new(i as f64 / rate, v + 1.0))
            .collect();
        let series = WaveformSeries::new(
            points,
            SeriesMetadata {
                source_filename: "tap.csv".to_string(),
                sample_count: 0,
                time_unit: "s".to_string(),
                base_time_unit: "s".to_string(),
                voltage_unit: "mV".to_string(),
                scale_factor: 1.0,
                sample_rate_hz: Some(rate),
            },
        );

        let filtered = lowpass_series(&series, 20.0, 4).unwrap();
        assert_eq!(filtered.times(), series.times());
        assert_eq!(filtered.metadata, series.metadata);
        let mid = &filtered.voltages()[100..400];
        assert!(mid.iter().all(|v| (v - 1.0).abs() < 0.01));
    }

    #[test]
    fn test_millisecond_axis_is_filtered_in_hz() {
        use crate::data::upload::Upload;
        use crate::processing::normalizer::{normalize, NormalizeOptions};

        let mut text = String::from("Time (ms),CH1\n");
        for i in 0..400 {
            text.push_str(&format!("{i},1.5\n"));
        }
        let upload = Upload::new("scope.csv", text.into_bytes());
        let series = normalize(&upload, &NormalizeOptions::default()).unwrap().series;
        assert_eq!(series.metadata.time_unit, "ms");
        let rate = series.sample_rate_hz().unwrap();
        assert!((rate - 1000.0).abs() < 1e-6, "rate {rate}");

        let filtered = lowpass_series(&series, 50.0, 4).unwrap();
        assert!(filtered.voltages().iter().all(|v| (v - 1.5).abs() < 1e-9));
    }
}
