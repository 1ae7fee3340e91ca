use crate::state::waveform::WaveformSeries;

/// Summary of the voltage values of a waveform.
#[derive(Debug, Clone, PartialEq)]
pub struct VoltageStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub peak_to_peak: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    /// Root mean square, a useful level for noise traces.
    pub rms: f64,
}

impl VoltageStats {
    /// Compute statistics over the finite values of `values`.
    pub fn compute(values: &[f64]) -> Option<Self> {
        let mut vals: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if vals.is_empty() {
            return None;
        }

        let count = vals.len();
        let min = vals.iter().copied().fold(f64::INFINITY, f64::min);
        let max = vals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = vals.iter().sum::<f64>() / count as f64;
        let rms = (vals.iter().map(|v| v * v).sum::<f64>() / count as f64).sqrt();

        vals.sort_by(|a, b| a.total_cmp(b));
        let median = if count % 2 == 0 {
            (vals[count / 2 - 1] + vals[count / 2]) / 2.0
        } else {
            vals[count / 2]
        };

        let variance = vals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

        Some(VoltageStats {
            count,
            min,
            max,
            peak_to_peak: max - min,
            mean,
            median,
            std_dev: variance.sqrt(),
            rms,
        })
    }

    pub fn of_series(series: &WaveformSeries) -> Option<Self> {
        Self::compute(&series.voltages())
    }

    /// Short label drawn in the corner of a chart.
    pub fn annotation(&self, unit: &str) -> String {
        format!("Peak-to-Peak: {:.2} {unit}", self.peak_to_peak)
    }

    pub fn report(&self, label: &str, unit: &str) -> String {
        format!(
            "{label}:\n  Samples: {}\n  Min: {:.4} {unit}\n  Max: {:.4} {unit}\n  Peak-to-Peak: {:.4} {unit}\n  Mean: {:.4} {unit}\n  Median: {:.4} {unit}\n  Std Dev: {:.4} {unit}\n  RMS: {:.4} {unit}\n",
            self.count, self.min, self.max, self.peak_to_peak, self.mean, self.median, self.std_dev, self.rms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_basic() {
        let stats = VoltageStats::compute(&[1.0, -1.0, 3.0, 1.0]).unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, -1.0);
        assert_eq!(stats.max, 3.0);
        assert_eq!(stats.peak_to_peak, 4.0);
        assert_eq!(stats.mean, 1.0);
        assert_eq!(stats.median, 1.0);
        assert!((stats.std_dev - 2f64.sqrt()).abs() < 1e-12);
        assert!((stats.rms - 3f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_compute_skips_non_finite() {
        let stats = VoltageStats::compute(&[f64::NAN, 2.0, f64::INFINITY]).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.peak_to_peak, 0.0);
        assert!(VoltageStats::compute(&[f64::NAN]).is_none());
        assert!(VoltageStats::compute(&[]).is_none());
    }

    #[test]
    fn test_annotation() {
        let stats = VoltageStats::compute(&[0.0, 12.346]).unwrap();
        assert_eq!(stats.annotation("mV"), "Peak-to-Peak: 12.35 mV");
        assert!(stats.report("Signal", "mV").starts_with("Signal:\n  Samples: 2\n"));
    }
}
