//! Session alignment
//!
//! Loads the aligned channel kinds present in a session directory, smooths
//! each at its native rate, and resamples all of them onto one uniform grid
//! spanning the union of their time ranges.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::formats::{AccFormat, ScalarFormat};
use crate::resample::{resample_to_grid, uniform_grid};
use crate::smoothing::SignalSmoother;
use crate::types::{
    finite_span, AlignedChannel, AlignedSession, AlignmentOutcome, ChannelKind, ScalarSamples,
    SessionChannels,
};

/// A channel after native-rate smoothing, ready for resampling
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothedChannel<'a> {
    pub channel: AlignedChannel,
    pub timestamps: &'a [f64],
    pub values: Vec<f64>,
}

/// Builds an [`AlignedSession`] from the channel files of one session
#[derive(Debug, Clone, Default)]
pub struct SessionAligner {
    config: PipelineConfig,
    smoother: SignalSmoother,
}

impl SessionAligner {
    pub fn new(config: PipelineConfig) -> Self {
        let smoother = SignalSmoother::from_config(&config);
        Self { config, smoother }
    }

    /// Load the aligned channel kinds present in `session_dir`.
    ///
    /// A missing file leaves its field `None`; only a present file that cannot
    /// be read or parsed is an error.
    pub fn load_channels(&self, session_dir: &Path) -> Result<SessionChannels, PipelineError> {
        Ok(SessionChannels {
            eda: load_scalar(session_dir, ChannelKind::Eda)?,
            temp: load_scalar(session_dir, ChannelKind::Temp)?,
            hr: load_scalar(session_dir, ChannelKind::Hr)?,
            bvp: load_scalar(session_dir, ChannelKind::Bvp)?,
            acc: match existing_file(session_dir, ChannelKind::Acc) {
                Some(path) => {
                    let contents = fs::read_to_string(&path)?;
                    Some(AccFormat.parse_samples(&path, &contents)?)
                }
                None => None,
            },
        })
    }

    /// Load, smooth and align one session directory
    pub fn align_dir(&self, session_dir: &Path) -> Result<AlignmentOutcome, PipelineError> {
        let channels = self.load_channels(session_dir)?;
        Ok(self.align(&channels))
    }

    /// Smooth every present channel at its native rate
    pub fn smooth<'a>(&self, channels: &'a SessionChannels) -> Vec<SmoothedChannel<'a>> {
        let mut smoothed = Vec::new();

        let scalars = [
            (AlignedChannel::Eda, &channels.eda),
            (AlignedChannel::Temp, &channels.temp),
            (AlignedChannel::Hr, &channels.hr),
            (AlignedChannel::Bvp, &channels.bvp),
        ];
        for (channel, samples) in scalars {
            if let Some(samples) = samples {
                smoothed.push(SmoothedChannel {
                    channel,
                    timestamps: &samples.timestamps,
                    values: self
                        .smoother
                        .smooth(samples.kind, &samples.values, samples.sample_rate_hz),
                });
            }
        }

        if let Some(acc) = &channels.acc {
            smoothed.push(SmoothedChannel {
                channel: AlignedChannel::AccMag,
                timestamps: &acc.timestamps,
                values: self
                    .smoother
                    .smooth(ChannelKind::Acc, &acc.magnitude, acc.sample_rate_hz),
            });
        }

        smoothed
    }

    /// Align already-loaded channels onto the common grid
    pub fn align(&self, channels: &SessionChannels) -> AlignmentOutcome {
        if channels.is_empty() {
            debug!("no aligned channel present");
            return AlignmentOutcome::NoUsableData;
        }

        let smoothed = self.smooth(channels);

        let Some((start, end)) = common_window(&smoothed) else {
            debug!("no present channel has a finite time span");
            return AlignmentOutcome::NoUsableData;
        };

        // Half-open: the last point may fall up to one step short of `end`
        let grid = uniform_grid(start, end, self.config.grid_step());
        if grid.is_empty() {
            debug!(start, end, "common window shorter than one grid step");
            return AlignmentOutcome::NoUsableData;
        }

        let mut session = AlignedSession::new(grid);
        for channel in &smoothed {
            if finite_span(channel.timestamps).is_none() {
                warn!(
                    column = channel.channel.column_name(),
                    "channel has no usable time base; column left missing"
                );
            }
            let column =
                resample_to_grid(channel.timestamps, &channel.values, session.timestamps());
            session.set_column(channel.channel, column);
        }

        debug!(
            rows = session.len(),
            columns = session.columns().len(),
            "aligned session"
        );
        AlignmentOutcome::Aligned(session)
    }
}

/// Union of the finite time spans of all channels
pub fn common_window(channels: &[SmoothedChannel<'_>]) -> Option<(f64, f64)> {
    let span = channels
        .iter()
        .filter_map(|c| finite_span(c.timestamps))
        .reduce(|(lo, hi), (l, h)| (lo.min(l), hi.max(h)))?;
    Some(span).filter(|(lo, hi)| lo.is_finite() && hi.is_finite())
}

fn existing_file(session_dir: &Path, kind: ChannelKind) -> Option<PathBuf> {
    let path = session_dir.join(kind.file_name());
    path.is_file().then_some(path)
}

fn load_scalar(
    session_dir: &Path,
    kind: ChannelKind,
) -> Result<Option<ScalarSamples>, PipelineError> {
    let Some(path) = existing_file(session_dir, kind) else {
        return Ok(None);
    };
    let contents = fs::read_to_string(&path)?;
    ScalarFormat::new(kind)
        .parse_samples(&path, &contents)
        .map(Some)
}
