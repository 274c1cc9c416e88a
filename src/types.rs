//! Core types for the alignment pipeline
//!
//! This module defines the data structures that flow through each stage:
//! native-rate channel records, the aligned session table, and the per-session
//! feature vector.

use serde::{Deserialize, Serialize};

/// Channel kind, derived from a raw file's base name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelKind {
    Eda,
    Temp,
    Hr,
    Bvp,
    Acc,
    Ibi,
    Tags,
}

impl ChannelKind {
    /// Every kind a device export may contain
    pub const ALL: [ChannelKind; 7] = [
        ChannelKind::Eda,
        ChannelKind::Temp,
        ChannelKind::Hr,
        ChannelKind::Bvp,
        ChannelKind::Acc,
        ChannelKind::Ibi,
        ChannelKind::Tags,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Eda => "EDA",
            ChannelKind::Temp => "TEMP",
            ChannelKind::Hr => "HR",
            ChannelKind::Bvp => "BVP",
            ChannelKind::Acc => "ACC",
            ChannelKind::Ibi => "IBI",
            ChannelKind::Tags => "TAGS",
        }
    }

    /// Resolve a kind from a file stem such as `eda` or `ACC`
    pub fn from_stem(stem: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(stem.trim()))
    }

    /// File name the device uses for this kind inside a session directory
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.as_str())
    }
}

/// Single-value channel (EDA, TEMP, HR, BVP) at its native rate.
///
/// Missing values and timestamps are NaN. When the rate line is absent or
/// non-positive, `sample_rate_hz` is `None` and every timestamp is NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarSamples {
    pub kind: ChannelKind,
    pub start_time: f64,
    pub sample_rate_hz: Option<f64>,
    pub timestamps: Vec<f64>,
    pub values: Vec<f64>,
}

/// Tri-axial acceleration with its derived magnitude
#[derive(Debug, Clone, PartialEq)]
pub struct AccSamples {
    pub start_time: f64,
    pub sample_rate_hz: Option<f64>,
    pub timestamps: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    /// `sqrt(x² + y² + z²)` per row, computed from the raw axes
    pub magnitude: Vec<f64>,
}

/// Inter-beat intervals; timestamps come from explicit offsets, not a rate
#[derive(Debug, Clone, PartialEq)]
pub struct IbiSamples {
    pub start_time: f64,
    pub offsets: Vec<f64>,
    pub ibi: Vec<f64>,
    pub timestamps: Vec<f64>,
}

/// Event tags, one per line; lines that fail to parse are `None`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagSamples {
    pub timestamps: Vec<Option<f64>>,
}

/// A parsed channel file, tagged by layout
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelRecord {
    Scalar(ScalarSamples),
    Acc(AccSamples),
    Ibi(IbiSamples),
    Tags(TagSamples),
}

impl ChannelRecord {
    pub fn kind(&self) -> ChannelKind {
        match self {
            ChannelRecord::Scalar(s) => s.kind,
            ChannelRecord::Acc(_) => ChannelKind::Acc,
            ChannelRecord::Ibi(_) => ChannelKind::Ibi,
            ChannelRecord::Tags(_) => ChannelKind::Tags,
        }
    }

    /// Number of rows read from the data section
    pub fn len(&self) -> usize {
        match self {
            ChannelRecord::Scalar(s) => s.values.len(),
            ChannelRecord::Acc(a) => a.magnitude.len(),
            ChannelRecord::Ibi(i) => i.ibi.len(),
            ChannelRecord::Tags(t) => t.timestamps.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sample_rate_hz(&self) -> Option<f64> {
        match self {
            ChannelRecord::Scalar(s) => s.sample_rate_hz,
            ChannelRecord::Acc(a) => a.sample_rate_hz,
            ChannelRecord::Ibi(_) | ChannelRecord::Tags(_) => None,
        }
    }

    /// Finite (min, max) timestamp, if any timestamp is finite
    pub fn time_span(&self) -> Option<(f64, f64)> {
        match self {
            ChannelRecord::Scalar(s) => finite_span(&s.timestamps),
            ChannelRecord::Acc(a) => finite_span(&a.timestamps),
            ChannelRecord::Ibi(i) => finite_span(&i.timestamps),
            ChannelRecord::Tags(t) => {
                let flat: Vec<f64> = t.timestamps.iter().flatten().copied().collect();
                finite_span(&flat)
            }
        }
    }
}

/// Min and max over the finite entries of a timestamp series
pub fn finite_span(timestamps: &[f64]) -> Option<(f64, f64)> {
    timestamps
        .iter()
        .copied()
        .filter(|t| t.is_finite())
        .fold(None, |acc, t| match acc {
            None => Some((t, t)),
            Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
        })
}

/// Channels that take part in alignment, loaded for one session.
///
/// A field is `None` when the session directory has no file for that kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionChannels {
    pub eda: Option<ScalarSamples>,
    pub temp: Option<ScalarSamples>,
    pub hr: Option<ScalarSamples>,
    pub bvp: Option<ScalarSamples>,
    pub acc: Option<AccSamples>,
}

impl SessionChannels {
    pub fn is_empty(&self) -> bool {
        self.eda.is_none()
            && self.temp.is_none()
            && self.hr.is_none()
            && self.bvp.is_none()
            && self.acc.is_none()
    }
}

/// Column of the aligned table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlignedChannel {
    #[serde(rename = "EDA")]
    Eda,
    #[serde(rename = "TEMP")]
    Temp,
    #[serde(rename = "HR")]
    Hr,
    #[serde(rename = "BVP")]
    Bvp,
    #[serde(rename = "ACC_mag")]
    AccMag,
}

impl AlignedChannel {
    /// Column order used by every table this crate writes
    pub const ORDER: [AlignedChannel; 5] = [
        AlignedChannel::Eda,
        AlignedChannel::Temp,
        AlignedChannel::Hr,
        AlignedChannel::Bvp,
        AlignedChannel::AccMag,
    ];

    pub fn column_name(&self) -> &'static str {
        match self {
            AlignedChannel::Eda => "EDA",
            AlignedChannel::Temp => "TEMP",
            AlignedChannel::Hr => "HR",
            AlignedChannel::Bvp => "BVP",
            AlignedChannel::AccMag => "ACC_mag",
        }
    }
}

/// Uniform multi-channel table for one session.
///
/// Every present column holds exactly `timestamps.len()` entries; missing
/// entries are NaN. Absent channels have no column at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedSession {
    timestamps: Vec<f64>,
    eda: Option<Vec<f64>>,
    temp: Option<Vec<f64>>,
    hr: Option<Vec<f64>>,
    bvp: Option<Vec<f64>>,
    acc_mag: Option<Vec<f64>>,
}

impl AlignedSession {
    pub fn new(timestamps: Vec<f64>) -> Self {
        Self {
            timestamps,
            ..Default::default()
        }
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Attach a column; its length must equal the grid length
    pub fn set_column(&mut self, channel: AlignedChannel, values: Vec<f64>) {
        assert_eq!(
            values.len(),
            self.timestamps.len(),
            "column {} does not match grid length",
            channel.column_name()
        );
        *self.slot_mut(channel) = Some(values);
    }

    pub fn column(&self, channel: AlignedChannel) -> Option<&[f64]> {
        match channel {
            AlignedChannel::Eda => self.eda.as_deref(),
            AlignedChannel::Temp => self.temp.as_deref(),
            AlignedChannel::Hr => self.hr.as_deref(),
            AlignedChannel::Bvp => self.bvp.as_deref(),
            AlignedChannel::AccMag => self.acc_mag.as_deref(),
        }
    }

    /// Present columns in table order
    pub fn columns(&self) -> Vec<(AlignedChannel, &[f64])> {
        AlignedChannel::ORDER
            .into_iter()
            .filter_map(|channel| self.column(channel).map(|values| (channel, values)))
            .collect()
    }

    fn slot_mut(&mut self, channel: AlignedChannel) -> &mut Option<Vec<f64>> {
        match channel {
            AlignedChannel::Eda => &mut self.eda,
            AlignedChannel::Temp => &mut self.temp,
            AlignedChannel::Hr => &mut self.hr,
            AlignedChannel::Bvp => &mut self.bvp,
            AlignedChannel::AccMag => &mut self.acc_mag,
        }
    }
}

/// Result of aligning one session
#[derive(Debug, Clone, PartialEq)]
pub enum AlignmentOutcome {
    Aligned(AlignedSession),
    /// No present channel has a finite time span
    NoUsableData,
}

/// Mean and standard deviation of one aligned column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub channel: AlignedChannel,
    pub mean: f64,
    pub std: f64,
}

/// Summary row for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFeatureVector {
    pub condition: String,
    pub subject: String,
    pub summaries: Vec<ChannelSummary>,
}

impl SessionFeatureVector {
    pub fn summary(&self, channel: AlignedChannel) -> Option<&ChannelSummary> {
        self.summaries.iter().find(|s| s.channel == channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_stem_is_case_insensitive() {
        assert_eq!(ChannelKind::from_stem("eda"), Some(ChannelKind::Eda));
        assert_eq!(ChannelKind::from_stem("TAGS"), Some(ChannelKind::Tags));
        assert_eq!(ChannelKind::from_stem("notes"), None);
    }

    #[test]
    fn test_session_channels_is_empty() {
        let mut channels = SessionChannels::default();
        assert!(channels.is_empty());

        channels.hr = Some(ScalarSamples {
            kind: ChannelKind::Hr,
            start_time: 0.0,
            sample_rate_hz: Some(1.0),
            timestamps: vec![0.0],
            values: vec![70.0],
        });
        assert!(!channels.is_empty());
    }

    #[test]
    fn test_finite_span_skips_nan() {
        assert_eq!(finite_span(&[f64::NAN, 3.0, 1.0, 2.0]), Some((1.0, 3.0)));
        assert_eq!(finite_span(&[f64::NAN]), None);
        assert_eq!(finite_span(&[]), None);
    }

    #[test]
    fn test_absent_column_is_distinct_from_missing_values() {
        let mut session = AlignedSession::new(vec![0.0, 0.25]);
        session.set_column(AlignedChannel::Hr, vec![f64::NAN, f64::NAN]);

        assert!(session.column(AlignedChannel::Eda).is_none());
        let hr = session.column(AlignedChannel::Hr).unwrap();
        assert!(hr.iter().all(|v| v.is_nan()));
        assert_eq!(session.columns().len(), 1);
    }

    #[test]
    #[should_panic(expected = "does not match grid length")]
    fn test_set_column_rejects_wrong_length() {
        let mut session = AlignedSession::new(vec![0.0, 0.25]);
        session.set_column(AlignedChannel::Temp, vec![1.0]);
    }
}
