//! CSV persistence for aligned sessions and feature tables
//!
//! Files are written to a temporary sibling and renamed into place, so a
//! reader never sees a partially written table. Missing values are empty
//! cells.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::Writer;

use crate::error::PipelineError;
use crate::features::FeatureTable;
use crate::types::AlignedSession;

/// Write an aligned session as `timestamp` plus one column per present channel
pub fn write_aligned_session(session: &AlignedSession, path: &Path) -> Result<(), PipelineError> {
    write_atomic(path, |out| write_aligned_to(session, out))
}

/// Serialize an aligned session into any writer
pub fn write_aligned_to<W: Write>(session: &AlignedSession, out: W) -> Result<(), PipelineError> {
    let mut writer = Writer::from_writer(out);
    let columns = session.columns();

    let mut header = vec!["timestamp"];
    header.extend(columns.iter().map(|(channel, _)| channel.column_name()));
    writer.write_record(&header)?;

    for (row, timestamp) in session.timestamps().iter().enumerate() {
        let mut record = Vec::with_capacity(columns.len() + 1);
        record.push(format_cell(Some(*timestamp)));
        record.extend(columns.iter().map(|(_, values)| format_cell(Some(values[row]))));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the aggregate feature table
pub fn write_feature_table(table: &FeatureTable, path: &Path) -> Result<(), PipelineError> {
    write_atomic(path, |out| write_features_to(table, out))
}

/// Serialize a feature table into any writer
pub fn write_features_to<W: Write>(table: &FeatureTable, out: W) -> Result<(), PipelineError> {
    let mut writer = Writer::from_writer(out);
    writer.write_record(table.header())?;

    for row in table.rows() {
        let mut record = vec![row.condition.clone(), row.subject.clone()];
        record.extend(table.cells(row).into_iter().map(format_cell));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

fn format_cell(value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => v.to_string(),
        _ => String::new(),
    }
}

fn write_atomic<F>(path: &Path, write: F) -> Result<(), PipelineError>
where
    F: FnOnce(&mut File) -> Result<(), PipelineError>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    let result = File::create(&tmp)
        .map_err(PipelineError::from)
        .and_then(|mut file| {
            write(&mut file)?;
            file.sync_all()?;
            Ok(())
        });

    match result {
        Ok(()) => {
            fs::rename(&tmp, path)?;
            Ok(())
        }
        Err(err) => {
            let _ = fs::remove_file(&tmp);
            Err(err)
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureSummarizer;
    use crate::types::AlignedChannel;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn session() -> AlignedSession {
        let mut session = AlignedSession::new(vec![1_370_000_000.0, 1_370_000_000.25]);
        session.set_column(AlignedChannel::Eda, vec![0.5, f64::NAN]);
        session.set_column(AlignedChannel::AccMag, vec![64.0, 63.5]);
        session
    }

    #[test]
    fn test_aligned_csv_layout() {
        let mut buf = Vec::new();
        write_aligned_to(&session(), &mut buf).unwrap();

        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "timestamp,EDA,ACC_mag\n1370000000,0.5,64\n1370000000.25,,63.5\n"
        );
    }

    #[test]
    fn test_feature_csv_leaves_absent_cells_empty() {
        let mut table = FeatureTable::new();
        table.push(FeatureSummarizer::summarize(&session(), "STRESS", "S01"));
        let mut hr_only = AlignedSession::new(vec![0.0, 0.25]);
        hr_only.set_column(AlignedChannel::Hr, vec![60.0, 62.0]);
        table.push(FeatureSummarizer::summarize(&hr_only, "AEROBIC", "S07"));

        let mut buf = Vec::new();
        write_features_to(&table, &mut buf).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "condition,subject,EDA_mean,EDA_std,HR_mean,HR_std,ACC_mag_mean,ACC_mag_std"
        );
        assert_eq!(lines[1], "STRESS,S01,0.5,0,,,63.75,0.25");
        assert_eq!(lines[2], "AEROBIC,S07,,,61,1,,");
    }

    #[test]
    fn test_atomic_write_creates_parent_and_leaves_no_temp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clean").join("STRESS").join("S01.csv");

        write_aligned_session(&session(), &path).unwrap();

        assert!(path.is_file());
        assert!(!temp_path(&path).exists());
    }
}
