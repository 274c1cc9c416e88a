//! wearable-align - Batch alignment engine for multi-rate wearable exports
//!
//! Turns per-channel device CSV exports into one uniformly sampled table per
//! recording session through a deterministic pipeline: format parsing →
//! time-base reconstruction → native-rate smoothing → common-grid resampling
//! → alignment → per-session feature summaries.
//!
//! ## Modules
//!
//! - **Formats**: parse EDA, TEMP, HR, BVP, ACC, IBI and TAGS files
//! - **Alignment**: smooth and resample present channels onto a 4 Hz grid
//! - **Batch**: walk a `<condition>/<subject>` tree and persist outputs

pub mod align;
pub mod batch;
pub mod config;
pub mod error;
pub mod features;
pub mod formats;
pub mod output;
pub mod resample;
pub mod smoothing;
pub mod timebase;
pub mod types;

pub use align::SessionAligner;
pub use batch::{BatchReport, SessionBatchDriver, SkipReason};
pub use config::{BatchConfig, PipelineConfig};
pub use error::{PipelineError, TimestampParseError};
pub use features::{FeatureSummarizer, FeatureTable};
pub use formats::load_channel;
pub use types::{AlignedSession, AlignmentOutcome, ChannelKind, SessionFeatureVector};

/// Crate version reported by the CLI and batch reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
