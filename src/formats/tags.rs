//! Event tags: one timestamp token per line, no header

use std::path::Path;

use tracing::debug;

use super::ChannelFormat;
use crate::error::PipelineError;
use crate::timebase::{first_token, parse_timestamp};
use crate::types::{ChannelRecord, TagSamples};

/// TAGS layout
pub struct TagsFormat;

impl TagsFormat {
    /// Never fails on content: unparseable lines become `None`
    pub fn parse_samples(&self, path: &Path, contents: &str) -> TagSamples {
        let timestamps = contents
            .lines()
            .map(first_token)
            .filter(|token| !token.is_empty())
            .map(|token| match parse_timestamp(token) {
                Ok(epoch) => Some(epoch),
                Err(err) => {
                    debug!(path = %path.display(), %err, "tag line left missing");
                    None
                }
            })
            .collect();

        TagSamples { timestamps }
    }
}

impl ChannelFormat for TagsFormat {
    fn parse(&self, path: &Path, contents: &str) -> Result<ChannelRecord, PipelineError> {
        Ok(ChannelRecord::Tags(self.parse_samples(path, contents)))
    }
}
