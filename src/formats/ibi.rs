//! Inter-beat intervals
//!
//! Line 1 holds the start time; there is no rate line. Each row is
//! `(offset_seconds, ibi_seconds)` relative to the start.

use std::path::Path;

use super::{split_header, ChannelFormat, DataRows};
use crate::error::PipelineError;
use crate::timebase::{first_token, parse_timestamp};
use crate::types::{ChannelRecord, IbiSamples};

/// IBI layout
pub struct IbiFormat;

impl IbiFormat {
    pub fn parse_samples(&self, path: &Path, contents: &str) -> Result<IbiSamples, PipelineError> {
        let (header, body) = split_header(path, contents, 1)?;
        let start_time = parse_timestamp(first_token(header[0]))?;

        let rows = DataRows::read(body)?;
        if !rows.is_empty() && rows.columns < 2 {
            return Err(PipelineError::format(
                path,
                format!("IBI expected 2 columns, got {}", rows.columns),
            ));
        }

        let offsets = rows.column(0);
        let ibi = rows.column(1);
        let timestamps = offsets.iter().map(|offset| start_time + offset).collect();

        Ok(IbiSamples {
            start_time,
            offsets,
            ibi,
            timestamps,
        })
    }
}

impl ChannelFormat for IbiFormat {
    fn parse(&self, path: &Path, contents: &str) -> Result<ChannelRecord, PipelineError> {
        self.parse_samples(path, contents).map(ChannelRecord::Ibi)
    }
}
