//! Single-value channels: EDA, TEMP, HR, BVP
//!
//! Line 1 holds the start time, line 2 the sample rate in Hz, and every
//! following row one value.

use std::path::Path;

use tracing::warn;

use super::{parse_rate, rate_timestamps, split_header, ChannelFormat, DataRows};
use crate::error::PipelineError;
use crate::timebase::{first_token, parse_timestamp};
use crate::types::{ChannelKind, ChannelRecord, ScalarSamples};

/// Layout of a rate-bearing single-value channel
pub struct ScalarFormat {
    kind: ChannelKind,
}

impl ScalarFormat {
    pub const fn new(kind: ChannelKind) -> Self {
        Self { kind }
    }

    /// Parse into typed samples without going through [`ChannelRecord`]
    pub fn parse_samples(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<ScalarSamples, PipelineError> {
        let (header, body) = split_header(path, contents, 2)?;
        let start_time = parse_timestamp(first_token(header[0]))?;
        let sample_rate_hz = parse_rate(first_token(header[1]));

        if sample_rate_hz.is_none() {
            warn!(
                path = %path.display(),
                token = first_token(header[1]),
                "no usable sample rate; channel timestamps are missing"
            );
        }

        let rows = DataRows::read(body)?;
        let values = rows.column(0);
        let timestamps = rate_timestamps(start_time, sample_rate_hz, values.len());

        Ok(ScalarSamples {
            kind: self.kind,
            start_time,
            sample_rate_hz,
            timestamps,
            values,
        })
    }
}

impl ChannelFormat for ScalarFormat {
    fn parse(&self, path: &Path, contents: &str) -> Result<ChannelRecord, PipelineError> {
        self.parse_samples(path, contents).map(ChannelRecord::Scalar)
    }
}
