//! Channel file formats
//!
//! Each device export is a headerless CSV whose first lines carry the time
//! base. This module reads one file and maps it to a typed [`ChannelRecord`]
//! according to its [`ChannelKind`], which is taken from the file's base name.

mod acc;
mod ibi;
mod scalar;
mod tags;

pub use acc::AccFormat;
pub use ibi::IbiFormat;
pub use scalar::ScalarFormat;
pub use tags::TagsFormat;

use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use crate::error::PipelineError;
use crate::types::{ChannelKind, ChannelRecord};

/// Trait for channel file layouts
pub trait ChannelFormat {
    /// Parse the full text of a channel file
    fn parse(&self, path: &Path, contents: &str) -> Result<ChannelRecord, PipelineError>;
}

static EDA: ScalarFormat = ScalarFormat::new(ChannelKind::Eda);
static TEMP: ScalarFormat = ScalarFormat::new(ChannelKind::Temp);
static HR: ScalarFormat = ScalarFormat::new(ChannelKind::Hr);
static BVP: ScalarFormat = ScalarFormat::new(ChannelKind::Bvp);

/// Layout handler for a channel kind
pub fn format_for(kind: ChannelKind) -> &'static dyn ChannelFormat {
    match kind {
        ChannelKind::Eda => &EDA,
        ChannelKind::Temp => &TEMP,
        ChannelKind::Hr => &HR,
        ChannelKind::Bvp => &BVP,
        ChannelKind::Acc => &AccFormat,
        ChannelKind::Ibi => &IbiFormat,
        ChannelKind::Tags => &TagsFormat,
    }
}

/// Resolve the channel kind from a path's base name
pub fn kind_of(path: &Path) -> Result<ChannelKind, PipelineError> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(ChannelKind::from_stem)
        .ok_or_else(|| PipelineError::format(path, "file name does not name a known channel"))
}

/// Read and parse one channel file
pub fn load_channel(path: &Path) -> Result<ChannelRecord, PipelineError> {
    let kind = kind_of(path)?;
    let contents = fs::read_to_string(path)?;
    let record = format_for(kind).parse(path, &contents)?;
    debug!(
        path = %path.display(),
        kind = kind.as_str(),
        rows = record.len(),
        sample_rate_hz = ?record.sample_rate_hz(),
        "loaded channel file"
    );
    Ok(record)
}

/// Split the leading header lines from the data section.
///
/// Fails when the file has fewer than `count` lines.
pub(crate) fn split_header<'a>(
    path: &Path,
    contents: &'a str,
    count: usize,
) -> Result<(Vec<&'a str>, &'a str), PipelineError> {
    let mut header = Vec::with_capacity(count);
    let mut offset = 0;

    for line in contents.split_inclusive('\n').take(count) {
        header.push(line.trim_end_matches(['\r', '\n']));
        offset += line.len();
    }

    if header.len() < count {
        return Err(PipelineError::format(
            path,
            format!("expected {count} header line(s), found {}", header.len()),
        ));
    }

    Ok((header, &contents[offset..]))
}

/// Data rows of a channel file and the widest row's column count
pub(crate) struct DataRows {
    pub records: Vec<StringRecord>,
    pub columns: usize,
}

impl DataRows {
    pub fn read(body: &str) -> Result<Self, PipelineError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(body.as_bytes());

        let mut records = Vec::new();
        let mut columns = 0;
        for record in reader.records() {
            let record = record?;
            columns = columns.max(record.len());
            records.push(record);
        }

        Ok(Self { records, columns })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Numeric column; absent, non-numeric or non-finite cells become NaN
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.records
            .iter()
            .map(|record| parse_cell(record.get(index)))
            .collect()
    }
}

fn parse_cell(cell: Option<&str>) -> f64 {
    cell.and_then(|c| c.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(f64::NAN)
}

/// Sample rate from a header token; `None` unless positive and finite
pub(crate) fn parse_rate(token: &str) -> Option<f64> {
    token
        .parse::<f64>()
        .ok()
        .filter(|fs| fs.is_finite() && *fs > 0.0)
}

/// `start + i / fs` for each row, or all NaN without a usable rate
pub(crate) fn rate_timestamps(start: f64, sample_rate_hz: Option<f64>, len: usize) -> Vec<f64> {
    match sample_rate_hz {
        Some(fs) => (0..len).map(|i| start + i as f64 / fs).collect(),
        None => vec![f64::NAN; len],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_split_header() {
        let path = PathBuf::from("EDA.csv");
        let (header, body) = split_header(&path, "1370000000\r\n4.0\n0.1\n0.2\n", 2).unwrap();
        assert_eq!(header, vec!["1370000000", "4.0"]);
        assert_eq!(body, "0.1\n0.2\n");
    }

    #[test]
    fn test_split_header_too_short() {
        let path = PathBuf::from("EDA.csv");
        let err = split_header(&path, "1370000000\n", 2).unwrap_err();
        assert!(matches!(err, PipelineError::Format { .. }));
    }

    #[test]
    fn test_data_rows_ragged_and_blank() {
        let rows = DataRows::read("1,2,3\n\n4,5\nx,6,7\n").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.columns, 3);

        let z = rows.column(2);
        assert_eq!(z[0], 3.0);
        assert!(z[1].is_nan());
        assert_eq!(z[2], 7.0);
        assert!(rows.column(0)[2].is_nan());
    }

    #[test]
    fn test_non_finite_cells_are_missing() {
        let rows = DataRows::read("inf
1e999
-inf
NaN
0.5
").unwrap();
        let values = rows.column(0);
        assert!(values[..4].iter().all(|v| v.is_nan()));
        assert_eq!(values[4], 0.5);
    }

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("4.000000"), Some(4.0));
        assert_eq!(parse_rate("0"), None);
        assert_eq!(parse_rate("-1"), None);
        assert_eq!(parse_rate(""), None);
    }

    #[test]
    fn test_load_channel_dispatches_ibi() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("IBI.csv");
        fs::write(&path, "1370000000, IBI\n5.0,0.81\n5.8,0.80\n").unwrap();

        match load_channel(&path).unwrap() {
            ChannelRecord::Ibi(ibi) => {
                assert_eq!(ibi.timestamps[0], 1_370_000_005.0);
                assert!((ibi.timestamps[1] - 1_370_000_005.8).abs() < 1e-6);
                assert_eq!(ibi.ibi, vec![0.81, 0.80]);
            }
            other => panic!("unexpected record: {:?}", other.kind()),
        }
    }

    #[test]
    fn test_load_channel_dispatches_lowercase_tags() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tags.csv");
        fs::write(&path, "1370000000\n\nnot a time\n2013-06-01 00:00:00\n").unwrap();

        let record = load_channel(&path).unwrap();
        assert_eq!(record.kind(), ChannelKind::Tags);
        match record {
            ChannelRecord::Tags(tags) => assert_eq!(
                tags.timestamps,
                vec![Some(1_370_000_000.0), None, Some(1_370_044_800.0)]
            ),
            other => panic!("unexpected record: {:?}", other.kind()),
        }
    }

    #[test]
    fn test_kind_of() {
        assert_eq!(kind_of(Path::new("/data/S01/ACC.csv")).unwrap(), ChannelKind::Acc);
        assert!(kind_of(Path::new("/data/S01/info.txt")).is_err());
    }
}
