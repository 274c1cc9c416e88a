//! Batch orchestration
//!
//! Walks `<raw>/<condition>/<subject>/`, aligns and summarizes each session,
//! and writes one aligned table per session plus the aggregate feature table.
//! A failing session is logged and skipped; the run always continues.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::align::SessionAligner;
use crate::config::BatchConfig;
use crate::error::PipelineError;
use crate::features::{FeatureSummarizer, FeatureTable};
use crate::output::{write_aligned_session, write_feature_table};
use crate::types::AlignmentOutcome;
use crate::VERSION;

/// Why a session was not processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No channel with a finite time span; absent rather than malformed data
    NoUsableData,
    FormatError,
    TimestampParseError,
    IoError,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NoUsableData => "no_usable_data",
            SkipReason::FormatError => "format_error",
            SkipReason::TimestampParseError => "timestamp_parse_error",
            SkipReason::IoError => "io_error",
        }
    }

    /// Classify an error raised while processing a session
    pub fn classify(err: &PipelineError) -> Self {
        match err {
            PipelineError::Format { .. } | PipelineError::Csv(_) => SkipReason::FormatError,
            PipelineError::TimestampParse(_) => SkipReason::TimestampParseError,
            PipelineError::Io(_) | PipelineError::Json(_) => SkipReason::IoError,
        }
    }
}

/// A session that produced an aligned table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedSession {
    pub condition: String,
    pub subject: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub output: PathBuf,
}

/// A session left out of the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSession {
    pub condition: String,
    pub subject: String,
    pub reason: SkipReason,
    pub detail: String,
}

/// Summary of one batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub processed: Vec<ProcessedSession>,
    pub skipped: Vec<SkippedSession>,
    /// Written only when at least one session was processed
    pub features_path: Option<PathBuf>,
    pub feature_columns: Vec<String>,
}

impl BatchReport {
    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.iter().filter(|s| s.reason == reason).count()
    }
}

/// Runs alignment and summarization over a dataset tree
pub struct SessionBatchDriver {
    config: BatchConfig,
    aligner: SessionAligner,
}

impl SessionBatchDriver {
    pub fn new(config: BatchConfig) -> Self {
        let aligner = SessionAligner::new(config.pipeline.clone());
        Self { config, aligner }
    }

    /// Process every session and persist outputs.
    ///
    /// Only failures writing the aggregate feature table abort the run.
    pub fn run(&self) -> Result<BatchReport, PipelineError> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        info!(%run_id, raw_dir = %self.config.raw_dir.display(), "starting batch run");

        let mut table = FeatureTable::new();
        let mut processed = Vec::new();
        let mut skipped = Vec::new();

        for condition in &self.config.conditions {
            let condition_dir = self.config.raw_dir.join(condition);
            if !condition_dir.is_dir() {
                info!(condition = %condition, "condition directory missing, skipping");
                continue;
            }

            let subjects = match subject_dirs(&condition_dir) {
                Ok(subjects) => subjects,
                Err(err) => {
                    warn!(
                        condition = %condition,
                        error = %err,
                        "cannot list condition directory, skipping"
                    );
                    continue;
                }
            };

            for (subject, session_dir) in subjects {
                match self.process_session(condition, &subject, &session_dir, &mut table) {
                    Ok(Some(session)) => processed.push(session),
                    Ok(None) => {
                        info!(
                            condition = %condition,
                            subject = %subject,
                            "no usable data, skipping"
                        );
                        skipped.push(SkippedSession {
                            condition: condition.clone(),
                            subject,
                            reason: SkipReason::NoUsableData,
                            detail: "no channel with a finite time span".to_string(),
                        });
                    }
                    Err(err) => {
                        let reason = SkipReason::classify(&err);
                        warn!(
                            condition = %condition,
                            subject = %subject,
                            reason = reason.as_str(),
                            error = %err,
                            "skipping session"
                        );
                        skipped.push(SkippedSession {
                            condition: condition.clone(),
                            subject,
                            reason,
                            detail: err.to_string(),
                        });
                    }
                }
            }
        }

        let features_path = if table.is_empty() {
            None
        } else {
            let path = self.config.features_path();
            write_feature_table(&table, &path)?;
            info!(path = %path.display(), rows = table.len(), "saved feature table");
            Some(path)
        };

        let report = BatchReport {
            run_id,
            version: VERSION.to_string(),
            started_at,
            finished_at: Utc::now(),
            processed,
            skipped,
            features_path,
            feature_columns: table.feature_columns(),
        };
        info!(
            %run_id,
            processed = report.processed_count(),
            skipped = report.skipped_count(),
            no_usable_data = report.skipped_for(SkipReason::NoUsableData),
            "batch run finished"
        );
        Ok(report)
    }

    /// Align, persist and summarize one session; `None` means no usable data
    fn process_session(
        &self,
        condition: &str,
        subject: &str,
        session_dir: &Path,
        table: &mut FeatureTable,
    ) -> Result<Option<ProcessedSession>, PipelineError> {
        let session = match self.aligner.align_dir(session_dir)? {
            AlignmentOutcome::Aligned(session) => session,
            AlignmentOutcome::NoUsableData => return Ok(None),
        };

        let output = self
            .config
            .clean_dir()
            .join(condition)
            .join(format!("{subject}.csv"));
        write_aligned_session(&session, &output)?;
        info!(path = %output.display(), rows = session.len(), "saved aligned session");

        table.push(FeatureSummarizer::summarize(&session, condition, subject));

        Ok(Some(ProcessedSession {
            condition: condition.to_string(),
            subject: subject.to_string(),
            rows: session.len(),
            columns: session
                .columns()
                .iter()
                .map(|(channel, _)| channel.column_name().to_string())
                .collect(),
            output,
        }))
    }
}

/// Subject directories under a condition, sorted by name
fn subject_dirs(condition_dir: &Path) -> Result<Vec<(String, PathBuf)>, PipelineError> {
    let mut subjects = Vec::new();
    for entry in fs::read_dir(condition_dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            subjects.push((name.to_string(), path.clone()));
        }
    }
    subjects.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(subjects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::{tempdir, TempDir};

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), contents).unwrap();
    }

    fn eda_file(samples: usize) -> String {
        let mut contents = String::from("1370000000\n4\n");
        for i in 0..samples {
            contents.push_str(&format!("{}\n", 0.5 + i as f64 * 0.01));
        }
        contents
    }

    fn fixture() -> (TempDir, BatchConfig) {
        let root = tempdir().unwrap();
        let raw = root.path().join("raw");

        // Good session with EDA and HR
        let s01 = raw.join("STRESS").join("S01");
        write(&s01, "EDA.csv", &eda_file(40));
        write(&s01, "HR.csv", "1370000000\n1\n70\n71\n72\n73\n74\n75\n76\n77\n78\n79\n");
        write(&s01, "tags.csv", "1370000005\n");

        // Malformed ACC
        let s02 = raw.join("STRESS").join("S02");
        write(&s02, "ACC.csv", "1370000000\n32\n1,2\n3,4\n");

        // Only auxiliary channels
        let s03 = raw.join("AEROBIC").join("S03");
        write(&s03, "IBI.csv", "1370000000\n1.0,0.8\n");

        // Unreadable start time
        let s04 = raw.join("ANAEROBIC").join("S04");
        write(&s04, "TEMP.csv", "sometime\n4\n33.0\n");

        // Temperature only
        let s05 = raw.join("ANAEROBIC").join("S05");
        write(&s05, "TEMP.csv", "2013-06-01 00:00:00\n4\n33.0\n33.1\n33.2\n33.3\n");

        let config = BatchConfig::new(raw, root.path().join("processed"));
        (root, config)
    }

    #[test]
    fn test_run_processes_and_skips() {
        let (_root, config) = fixture();
        let report = SessionBatchDriver::new(config.clone()).run().unwrap();

        let processed: Vec<(&str, &str)> = report
            .processed
            .iter()
            .map(|p| (p.condition.as_str(), p.subject.as_str()))
            .collect();
        assert_eq!(processed, vec![("STRESS", "S01"), ("ANAEROBIC", "S05")]);

        assert_eq!(report.skipped_count(), 3);
        assert_eq!(report.skipped_for(SkipReason::FormatError), 1);
        assert_eq!(report.skipped_for(SkipReason::NoUsableData), 1);
        assert_eq!(report.skipped_for(SkipReason::TimestampParseError), 1);

        assert_eq!(report.processed[0].columns, vec!["EDA", "HR"]);
        assert!(config.clean_dir().join("STRESS").join("S01.csv").is_file());
        assert!(!config.clean_dir().join("STRESS").join("S02.csv").exists());
    }

    #[test]
    fn test_feature_table_written_with_union_columns() {
        let (_root, config) = fixture();
        let report = SessionBatchDriver::new(config.clone()).run().unwrap();

        assert_eq!(report.features_path, Some(config.features_path()));
        assert_eq!(
            report.feature_columns,
            vec!["EDA_mean", "EDA_std", "TEMP_mean", "TEMP_std", "HR_mean", "HR_std"]
        );

        let text = fs::read_to_string(config.features_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("STRESS,S01,"));
        assert!(lines[2].starts_with("ANAEROBIC,S05,,,"));
    }

    #[test]
    fn test_aligned_rows_match_grid() {
        let (_root, config) = fixture();
        SessionBatchDriver::new(config.clone()).run().unwrap();

        // EDA spans 9.75 s and HR 9 s from the same start: ceil(9.75 / 0.25) rows
        let text = fs::read_to_string(config.clean_dir().join("STRESS").join("S01.csv")).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("timestamp,EDA,HR"));
        assert_eq!(lines.count(), 39);
    }

    #[test]
    fn test_missing_raw_root_yields_empty_report() {
        let root = tempdir().unwrap();
        let config = BatchConfig::new(root.path().join("nope"), root.path().join("out"));
        let report = SessionBatchDriver::new(config.clone()).run().unwrap();

        assert_eq!(report.processed_count(), 0);
        assert_eq!(report.features_path, None);
        assert!(!config.features_path().exists());
    }
}
