//! Per-session feature summaries
//!
//! This module reduces an aligned session to one row of classifier input:
//! - NaN-tolerant mean and population standard deviation per present column
//! - A dataset-level table whose column order stays stable across runs

use std::collections::BTreeMap;

use crate::config::DEFAULT_CONDITIONS;
use crate::types::{AlignedChannel, AlignedSession, ChannelSummary, SessionFeatureVector};

/// Key columns that precede the feature columns
pub const KEY_COLUMNS: [&str; 2] = ["condition", "subject"];

/// Feature summarizer for aligned sessions
pub struct FeatureSummarizer;

impl FeatureSummarizer {
    /// Summarize every present column of `session`
    pub fn summarize(
        session: &AlignedSession,
        condition: &str,
        subject: &str,
    ) -> SessionFeatureVector {
        let summaries = session
            .columns()
            .into_iter()
            .map(|(channel, values)| ChannelSummary {
                channel,
                mean: nan_mean(values),
                std: nan_std(values),
            })
            .collect();

        SessionFeatureVector {
            condition: condition.to_string(),
            subject: subject.to_string(),
            summaries,
        }
    }
}

/// Mean over non-NaN entries; NaN when there are none
pub fn nan_mean(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Population standard deviation over non-NaN entries
pub fn nan_std(values: &[f64]) -> f64 {
    let mean = nan_mean(values);
    if mean.is_nan() {
        return f64::NAN;
    }
    let (sum_sq, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(acc, count), v| (acc + (v - mean).powi(2), count + 1));
    (sum_sq / count as f64).sqrt()
}

/// Integer class id for a condition, following the default condition order
pub fn label_id(condition: &str) -> Option<u32> {
    DEFAULT_CONDITIONS
        .iter()
        .position(|c| c.eq_ignore_ascii_case(condition))
        .map(|i| i as u32)
}

/// Condition name to class id, as consumed by model training
pub fn label_map() -> BTreeMap<String, u32> {
    DEFAULT_CONDITIONS
        .iter()
        .enumerate()
        .map(|(i, c)| (c.to_string(), i as u32))
        .collect()
}

/// Feature rows for a whole dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    rows: Vec<SessionFeatureVector>,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: SessionFeatureVector) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[SessionFeatureVector] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Channels present in at least one row, in table order
    pub fn channels(&self) -> Vec<AlignedChannel> {
        AlignedChannel::ORDER
            .into_iter()
            .filter(|channel| self.rows.iter().any(|row| row.summary(*channel).is_some()))
            .collect()
    }

    /// Ordered non-key columns: `<channel>_mean`, `<channel>_std` per channel
    pub fn feature_columns(&self) -> Vec<String> {
        self.channels()
            .into_iter()
            .flat_map(|channel| {
                let name = channel.column_name();
                [format!("{name}_mean"), format!("{name}_std")]
            })
            .collect()
    }

    /// Full header: key columns followed by feature columns
    pub fn header(&self) -> Vec<String> {
        KEY_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.feature_columns())
            .collect()
    }

    /// One cell per feature column; absent channels and NaN become `None`
    pub fn cells(&self, row: &SessionFeatureVector) -> Vec<Option<f64>> {
        self.channels()
            .into_iter()
            .flat_map(|channel| match row.summary(channel) {
                Some(summary) => [finite(summary.mean), finite(summary.std)],
                None => [None, None],
            })
            .collect()
    }
}

fn finite(value: f64) -> Option<f64> {
    (!value.is_nan()).then_some(value)
}
