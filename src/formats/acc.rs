//! Tri-axial acceleration
//!
//! Same header as the single-value channels, with three data columns.

use std::path::Path;

use tracing::warn;

use super::{parse_rate, rate_timestamps, split_header, ChannelFormat, DataRows};
use crate::error::PipelineError;
use crate::timebase::{first_token, parse_timestamp};
use crate::types::{AccSamples, ChannelRecord};

/// ACC layout
pub struct AccFormat;

impl AccFormat {
    pub fn parse_samples(&self, path: &Path, contents: &str) -> Result<AccSamples, PipelineError> {
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
        if !rows.is_empty() && rows.columns < 3 {
            return Err(PipelineError::format(
                path,
                format!("ACC expected 3 columns, got {}", rows.columns),
            ));
        }

        let x = rows.column(0);
        let y = rows.column(1);
        let z = rows.column(2);
        let magnitude = x
            .iter()
            .zip(&y)
            .zip(&z)
            .map(|((x, y), z)| (x * x + y * y + z * z).sqrt())
            .collect();
        let timestamps = rate_timestamps(start_time, sample_rate_hz, x.len());

        Ok(AccSamples {
            start_time,
            sample_rate_hz,
            timestamps,
            x,
            y,
            z,
            magnitude,
        })
    }
}

impl ChannelFormat for AccFormat {
    fn parse(&self, path: &Path, contents: &str) -> Result<ChannelRecord, PipelineError> {
        self.parse_samples(path, contents).map(ChannelRecord::Acc)
    }
}
