use crate::state::waveform::WaveformPoint;

/// Largest-Triangle-Three-Buckets decimation to `target` points.
///
/// The first and last points are always kept. Inputs shorter than `target`
/// (or targets below 3) are returned as-is.
pub fn lttb(points: &[WaveformPoint], target: usize) -> Vec<[f64; 2]> {
    let n = points.len();
    if n <= target || target < 3 {
        return points.iter().map(|p| [p.time, p.voltage]).collect();
    }

    let mut out = Vec::with_capacity(target);
    out.push([points[0].time, points[0].voltage]);

    let bucket_size = (n - 2) as f64 / (target - 2) as f64;
    let mut prev = 0usize;

    for i in 0..(target - 2) {
        let start = ((i as f64 * bucket_size) as usize + 1).min(n - 1);
        let end = (((i + 1) as f64 * bucket_size) as usize + 1).min(n - 1);

        // Average of the following bucket is the third triangle vertex.
        let next_start = end;
        let next_end = (((i + 2) as f64 * bucket_size) as usize + 1).min(n);
        let next = &points[next_start..next_end.max(next_start + 1).min(n)];
        let avg_t = next.iter().map(|p| p.time).sum::<f64>() / next.len() as f64;
        let avg_v = next.iter().map(|p| p.voltage).sum::<f64>() / next.len() as f64;

        let a = points[prev];
        let mut best = start;
        let mut best_area = -1.0f64;
        for (j, p) in points.iter().enumerate().take(end.max(start + 1)).skip(start) {
            let area = ((a.time - avg_t) * (p.voltage - a.voltage)
                - (a.time - p.time) * (avg_v - a.voltage))
                .abs();
            if area > best_area {
                best_area = area;
                best = j;
            }
        }

        out.push([points[best].time, points[best].voltage]);
        prev = best;
    }

    let last = points[n - 1];
    out.push([last.time, last.voltage]);
    out
}

/// Points inside `[view_min, view_max]`, plus one neighbour either side for
/// line continuity, decimated to at most `max_points`.
pub fn downsample_for_view(
    points: &[WaveformPoint],
    view_min: f64,
    view_max: f64,
    max_points: usize,
) -> Vec<[f64; 2]> {
    if points.is_empty() {
        return Vec::new();
    }
    let start = points.partition_point(|p| p.time < view_min).saturating_sub(1);
    let end = (points.partition_point(|p| p.time <= view_max) + 1).min(points.len());
    if start >= end {
        return Vec::new();
    }
    lttb(&points[start..end], max_points)
}
