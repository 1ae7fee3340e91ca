use crate::error::AnalysisError;
use crate::state::waveform::{WaveformPoint, WaveformSeries};

/// A signal with a noise reference removed.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Matched points only: `signal - noise` at the signal's time.
    pub extracted: WaveformSeries,
    /// Noise voltage paired with each extracted point.
    pub noise: Vec<f64>,
    /// Signal voltage paired with each extracted point.
    pub signal: Vec<f64>,
    pub matched_count: usize,
    pub total_possible: usize,
}

/// Default alignment tolerance: half of the signal's median sample step.
pub fn default_tolerance(signal: &WaveformSeries) -> f64 {
    signal.median_step().map(|s| s * 0.5).unwrap_or(0.0)
}

/// Subtract a noise capture from a signal capture.
///
/// Each signal point is paired with the nearest noise point in time; pairs
/// further apart than `tolerance` are skipped. Both series are sorted by time
/// so the nearest neighbour comes from a binary search.
pub fn subtract_noise(
    signal: &WaveformSeries,
    noise: &WaveformSeries,
    tolerance: f64,
) -> Result<Extraction, AnalysisError> {
    let noise_times = noise.times();

    let mut points = Vec::new();
    let mut noise_vals = Vec::new();
    let mut signal_vals = Vec::new();

    for p in &signal.points {
        let pos = noise_times.partition_point(|&t| t < p.time);

        let mut best: Option<(usize, f64)> = None;
        for candidate in [pos.wrapping_sub(1), pos] {
            if let Some(&t) = noise_times.get(candidate) {
                let diff = (t - p.time).abs();
                if best.map_or(true, |(_, d)| diff < d) {
                    best = Some((candidate, diff));
                }
            }
        }

        if let Some((j, diff)) = best {
            if diff <= tolerance {
                let n = noise.points[j].voltage;
                points.push(WaveformPoint::new(p.time, p.voltage - n));
                noise_vals.push(n);
                signal_vals.push(p.voltage);
            }
        }
    }

    if points.is_empty() {
        return Err(AnalysisError::NoOverlap);
    }

    let total_possible = signal.len().min(noise.len());
    let matched_count = points.len();
    if matched_count < total_possible {
        tracing::warn!(
            "Only {} of {} samples aligned between signal and noise",
            matched_count,
            total_possible
        );
    }

    let mut metadata = signal.metadata.clone();
    metadata.source_filename = format!(
        "{} - {}",
        signal.metadata.source_filename, noise.metadata.source_filename
    );

    Ok(Extraction {
        extracted: WaveformSeries::new(points, metadata),
        noise: noise_vals,
        signal: signal_vals,
        matched_count,
        total_possible,
    })
}
