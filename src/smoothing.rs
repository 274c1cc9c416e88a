//! Native-rate smoothing
//!
//! A centered rolling median rejects short spikes from motion or contact loss
//! without shifting the signal in time; a centered rolling mean over the
//! median output then removes residual noise. Windows at the edges shrink to
//! the samples available, and non-finite entries are ignored inside a
//! window.

use crate::config::PipelineConfig;
use crate::types::ChannelKind;

/// Two-stage rolling filter configured in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalSmoother {
    median_window_sec: f64,
    mean_window_sec: f64,
    eda_range: (f64, f64),
}

impl Default for SignalSmoother {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl SignalSmoother {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            median_window_sec: config.median_window_sec,
            mean_window_sec: config.mean_window_sec,
            eda_range: (config.eda_min, config.eda_max),
        }
    }

    /// Smooth one channel sampled at `sample_rate_hz`.
    ///
    /// Without a known rate both windows collapse to one sample. EDA output is
    /// clamped to the configured physical range.
    pub fn smooth(
        &self,
        kind: ChannelKind,
        values: &[f64],
        sample_rate_hz: Option<f64>,
    ) -> Vec<f64> {
        let fs = sample_rate_hz.unwrap_or(0.0);
        let median = rolling_median(values, window_len(self.median_window_sec, fs));
        let mut smoothed = rolling_mean(&median, window_len(self.mean_window_sec, fs));

        if kind == ChannelKind::Eda {
            let (lo, hi) = self.eda_range;
            for value in smoothed.iter_mut().filter(|v| !v.is_nan()) {
                *value = value.clamp(lo, hi);
            }
        }

        smoothed
    }
}

/// `max(1, round(seconds * fs))`
pub fn window_len(seconds: f64, fs: f64) -> usize {
    let samples = (seconds * fs).round();
    if samples.is_finite() && samples >= 1.0 {
        samples as usize
    } else {
        1
    }
}

/// Index range `[lo, hi]` covered by a centered window of `window` at `i`
fn centered(i: usize, window: usize, len: usize) -> (usize, usize) {
    let before = window / 2;
    let after = (window - 1) / 2;
    (i.saturating_sub(before), (i + after).min(len - 1))
}

/// Centered rolling median over the finite samples
pub fn rolling_median(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    if values.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<f64> = Vec::with_capacity(window);
    let mut out = Vec::with_capacity(values.len());
    // Next index to enter the window and next index to leave it
    let (mut enter, mut leave) = (0usize, 0usize);

    for i in 0..values.len() {
        let (lo, hi) = centered(i, window, values.len());
        while enter <= hi {
            insert_sorted(&mut sorted, values[enter]);
            enter += 1;
        }
        while leave < lo {
            remove_sorted(&mut sorted, values[leave]);
            leave += 1;
        }
        out.push(median_of_sorted(&sorted));
    }

    out
}

/// Centered rolling mean over the finite samples
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    if values.is_empty() {
        return Vec::new();
    }

    let mut sum = 0.0;
    let mut count = 0usize;
    let mut out = Vec::with_capacity(values.len());
    let (mut enter, mut leave) = (0usize, 0usize);

    for i in 0..values.len() {
        let (lo, hi) = centered(i, window, values.len());
        while enter <= hi {
            if values[enter].is_finite() {
                sum += values[enter];
                count += 1;
            }
            enter += 1;
        }
        while leave < lo {
            if values[leave].is_finite() {
                sum -= values[leave];
                count -= 1;
            }
            leave += 1;
        }
        out.push(if count == 0 { f64::NAN } else { sum / count as f64 });
    }

    out
}

fn insert_sorted(sorted: &mut Vec<f64>, value: f64) {
    if !value.is_finite() {
        return;
    }
    let at = sorted.partition_point(|v| *v < value);
    sorted.insert(at, value);
}

fn remove_sorted(sorted: &mut Vec<f64>, value: f64) {
    if !value.is_finite() {
        return;
    }
    let at = sorted.partition_point(|v| *v < value);
    if at < sorted.len() && sorted[at] == value {
        sorted.remove(at);
    }
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    match n {
        0 => f64::NAN,
        _ if n % 2 == 1 => sorted[n / 2],
        _ => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn test_window_len() {
        assert_eq!(window_len(3.0, 4.0), 12);
        assert_eq!(window_len(3.0, 64.0), 192);
        assert_eq!(window_len(3.0, 0.1), 1);
        assert_eq!(window_len(3.0, 0.0), 1);
        assert_eq!(window_len(3.0, f64::NAN), 1);
    }

    #[test]
    fn test_median_rejects_spike() {
        let values = [1.0, 1.0, 50.0, 1.0, 1.0];
        assert_eq!(rolling_median(&values, 3), vec![1.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_even_window_is_centered_left() {
        // window 4 at i covers [i-2, i+1]
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(close(&rolling_mean(&values, 4), &[1.5, 2.0, 2.5, 3.5, 4.0]));
        assert!(close(&rolling_median(&values, 4), &[1.5, 2.0, 2.5, 3.5, 4.0]));
    }

    #[test]
    fn test_nan_is_ignored_in_window() {
        let values = [1.0, f64::NAN, 3.0];
        assert!(close(&rolling_mean(&values, 3), &[1.0, 2.0, 3.0]));
        assert!(close(&rolling_median(&values, 3), &[1.0, 2.0, 3.0]));

        let all_nan = rolling_mean(&[f64::NAN, f64::NAN], 1);
        assert!(all_nan.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_infinite_run_does_not_poison_later_output() {
        let mut values = vec![1.0; 40];
        values[5] = f64::INFINITY;
        let mean = rolling_mean(&values, 3);
        assert!(close(&mean[8..], &[1.0; 32]));

        let smoother = SignalSmoother::default();
        let mut temp = vec![36.0; 200];
        temp[10..13].fill(f64::INFINITY);
        temp[50] = f64::NEG_INFINITY;
        let smoothed = smoother.smooth(ChannelKind::Temp, &temp, Some(1.0));
        assert!(smoothed.iter().all(|v| v.is_finite()));
        assert!(close(&smoothed[190..], &[36.0; 10]));
    }

    #[test]
    fn test_output_length_matches_input() {
        let smoother = SignalSmoother::default();
        for len in [1usize, 2, 7, 100, 1000] {
            let values: Vec<f64> = (0..len).map(|i| (i as f64).sin()).collect();
            for fs in [None, Some(1.0), Some(4.0), Some(32.0), Some(64.0)] {
                assert_eq!(smoother.smooth(ChannelKind::Bvp, &values, fs).len(), len);
            }
        }
    }

    #[test]
    fn test_eda_is_clamped() {
        let smoother = SignalSmoother::default();
        let values: Vec<f64> = (0..40)
            .map(|i| if i < 20 { -5.0 } else { 120.0 })
            .collect();
        let smoothed = smoother.smooth(ChannelKind::Eda, &values, Some(4.0));
        assert!(smoothed.iter().all(|v| (0.0..=60.0).contains(v)));
    }

    #[test]
    fn test_no_rate_is_identity() {
        let smoother = SignalSmoother::default();
        let values = [3.0, 9.0, 1.0];
        assert_eq!(smoother.smooth(ChannelKind::Hr, &values, None), values.to_vec());
    }

    #[test]
    fn test_constant_signal_unchanged() {
        let smoother = SignalSmoother::default();
        let values = vec![36.5; 50];
        assert!(close(&smoother.smooth(ChannelKind::Temp, &values, Some(4.0)), &values));
    }
}
