//! Pipeline and batch configuration
//!
//! Configuration is always passed in explicitly. Both structs deserialize from
//! JSON with every field optional except the batch directories.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::PipelineError;

/// Target grid rate in Hz (one point every 0.25 s)
pub const DEFAULT_TARGET_HZ: f64 = 4.0;

/// Rolling window length in seconds for both smoothing stages
pub const DEFAULT_SMOOTHING_WINDOW_SEC: f64 = 3.0;

/// Physical EDA range in microsiemens
pub const EDA_RANGE: (f64, f64) = (0.0, 60.0);

/// Condition categories processed by default, in label order
pub const DEFAULT_CONDITIONS: [&str; 3] = ["STRESS", "AEROBIC", "ANAEROBIC"];

/// Tunable parameters for smoothing and resampling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Rate of the common grid every channel is resampled onto
    pub target_hz: f64,
    /// Median stage window in seconds
    pub median_window_sec: f64,
    /// Mean stage window in seconds
    pub mean_window_sec: f64,
    /// Lower EDA clamp
    pub eda_min: f64,
    /// Upper EDA clamp
    pub eda_max: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_hz: DEFAULT_TARGET_HZ,
            median_window_sec: DEFAULT_SMOOTHING_WINDOW_SEC,
            mean_window_sec: DEFAULT_SMOOTHING_WINDOW_SEC,
            eda_min: EDA_RANGE.0,
            eda_max: EDA_RANGE.1,
        }
    }
}

impl PipelineConfig {
    /// Grid step in seconds
    pub fn grid_step(&self) -> f64 {
        1.0 / self.target_hz
    }
}

/// Settings for a batch run over a raw dataset tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Root holding `<condition>/<subject>/<CHANNEL>.csv`
    pub raw_dir: PathBuf,
    /// Root receiving aligned tables and the feature table
    pub processed_dir: PathBuf,
    #[serde(default = "default_conditions")]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

fn default_conditions() -> Vec<String> {
    DEFAULT_CONDITIONS.iter().map(|c| c.to_string()).collect()
}

impl BatchConfig {
    pub fn new(raw_dir: impl Into<PathBuf>, processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            processed_dir: processed_dir.into(),
            conditions: default_conditions(),
            pipeline: PipelineConfig::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Directory for aligned per-session tables
    pub fn clean_dir(&self) -> PathBuf {
        self.processed_dir.join("clean")
    }

    /// Path of the aggregate feature table
    pub fn features_path(&self) -> PathBuf {
        self.processed_dir.join("features_per_session.csv")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.grid_step(), 0.25);
        assert_eq!((config.eda_min, config.eda_max), (0.0, 60.0));
    }

    #[test]
    fn test_batch_config_from_json_fills_defaults() {
        let config = BatchConfig::from_json(
            r#"{"raw_dir": "data/raw", "processed_dir": "data/processed"}"#,
        )
        .unwrap();

        assert_eq!(config.conditions, vec!["STRESS", "AEROBIC", "ANAEROBIC"]);
        assert_eq!(config.pipeline, PipelineConfig::default());
        assert_eq!(
            config.features_path(),
            PathBuf::from("data/processed/features_per_session.csv")
        );
    }

    #[test]
    fn test_partial_pipeline_override() {
        let config = BatchConfig::from_json(
            r#"{"raw_dir": "r", "processed_dir": "p", "pipeline": {"median_window_sec": 1.5}}"#,
        )
        .unwrap();

        assert_eq!(config.pipeline.median_window_sec, 1.5);
        assert_eq!(config.pipeline.mean_window_sec, 3.0);
    }

    #[test]
    fn test_missing_dirs_rejected() {
        assert!(BatchConfig::from_json(r#"{"raw_dir": "r"}"#).is_err());
    }
}
