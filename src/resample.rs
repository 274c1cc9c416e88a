//! Grid resampling
//!
//! Projects an irregular (timestamp, value) series onto a target grid with
//! elapsed-time-weighted linear interpolation. Grid points outside the
//! observed span of the source are missing; nothing is extrapolated.

/// Resample `values` observed at `timestamps` onto `grid`.
///
/// Pairs with a non-finite timestamp or value are dropped. Remaining
/// samples are sorted and equal timestamps collapse to the last one seen.
/// The output always has `grid.len()` entries.
pub fn resample_to_grid(timestamps: &[f64], values: &[f64], grid: &[f64]) -> Vec<f64> {
    let source = clean_source(timestamps, values);
    let (Some(&(first, _)), Some(&(last, _))) = (source.first(), source.last()) else {
        return vec![f64::NAN; grid.len()];
    };

    grid.iter()
        .map(|&t| {
            if !(first..=last).contains(&t) {
                return f64::NAN;
            }
            // First sample strictly after t; the one before it is at or before t
            let upper = source.partition_point(|&(ts, _)| ts <= t);
            let (t0, v0) = source[upper - 1];
            if t0 == t || upper == source.len() {
                return v0;
            }
            let (t1, v1) = source[upper];
            v0 + (v1 - v0) * (t - t0) / (t1 - t0)
        })
        .collect()
}

/// Valid samples sorted by time, last value wins on duplicate timestamps
fn clean_source(timestamps: &[f64], values: &[f64]) -> Vec<(f64, f64)> {
    let mut pairs: Vec<(f64, f64)> = timestamps
        .iter()
        .zip(values)
        .filter(|(t, v)| t.is_finite() && v.is_finite())
        .map(|(&t, &v)| (t, v))
        .collect();

    // Stable sort keeps file order among equal timestamps
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut deduped: Vec<(f64, f64)> = Vec::with_capacity(pairs.len());
    for pair in pairs {
        match deduped.last_mut() {
            Some(last) if last.0 == pair.0 => *last = pair,
            _ => deduped.push(pair),
        }
    }
    deduped
}

/// Half-open uniform grid `start, start + step, ...` strictly below `end`
pub fn uniform_grid(start: f64, end: f64, step: f64) -> Vec<f64> {
    if !(start.is_finite() && end.is_finite() && step > 0.0) || end <= start {
        return Vec::new();
    }
    let count = ((end - start) / step).ceil() as usize;
    (0..count).map(|i| start + i as f64 * step).collect()
}
