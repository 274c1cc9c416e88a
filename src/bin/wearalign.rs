//! wearalign - Command-line interface for wearable-align
//!
//! Commands:
//! - batch: Align every session under a raw dataset tree
//! - align: Align a single session directory
//! - inspect: Parse one channel file and summarize it

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use wearable_align::batch::{BatchReport, SkipReason};
use wearable_align::output::write_aligned_to;
use wearable_align::types::ChannelRecord;
use wearable_align::{
    load_channel, AlignmentOutcome, BatchConfig, PipelineConfig, PipelineError,
    SessionAligner, SessionBatchDriver, VERSION,
};

/// wearalign - Align multi-rate wearable exports onto a common grid
#[derive(Parser)]
#[command(name = "wearalign")]
#[command(version = VERSION)]
#[command(about = "Align wearable sensor exports and summarize sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Align every `<condition>/<subject>` session under a raw dataset root
    Batch {
        /// Raw dataset root
        #[arg(long, required_unless_present = "config")]
        raw_dir: Option<PathBuf>,

        /// Output root for aligned tables and the feature table
        #[arg(long, required_unless_present = "config")]
        processed_dir: Option<PathBuf>,

        /// Condition directory to process (repeatable)
        #[arg(long = "condition")]
        conditions: Vec<String>,

        /// JSON batch configuration; flags override its fields
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Align a single session directory
    Align {
        /// Session directory holding the channel CSV files
        #[arg(short, long)]
        session: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Grid rate in Hz
        #[arg(long, default_value_t = wearable_align::config::DEFAULT_TARGET_HZ)]
        target_hz: f64,
    },

    /// Parse one channel file and print a summary
    Inspect {
        /// Channel CSV file (EDA, TEMP, HR, BVP, ACC, IBI or TAGS)
        #[arg(short, long)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let error = CliError::from(e);
            eprintln!(
                "{}",
                serde_json::to_string(&error).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), AlignCliError> {
    match cli.command {
        Commands::Batch {
            raw_dir,
            processed_dir,
            conditions,
            config,
            json,
        } => cmd_batch(raw_dir, processed_dir, conditions, config.as_deref(), json),

        Commands::Align {
            session,
            output,
            target_hz,
        } => cmd_align(&session, &output, target_hz),

        Commands::Inspect { file, json } => cmd_inspect(&file, json),
    }
}

fn cmd_batch(
    raw_dir: Option<PathBuf>,
    processed_dir: Option<PathBuf>,
    conditions: Vec<String>,
    config_path: Option<&Path>,
    json: bool,
) -> Result<(), AlignCliError> {
    let mut config = match config_path {
        Some(path) => BatchConfig::from_json(&fs::read_to_string(path)?)?,
        None => match (&raw_dir, &processed_dir) {
            (Some(raw), Some(processed)) => BatchConfig::new(raw, processed),
            _ => return Err(AlignCliError::MissingDirectories),
        },
    };

    if let Some(raw) = raw_dir {
        config.raw_dir = raw;
    }
    if let Some(processed) = processed_dir {
        config.processed_dir = processed;
    }
    if !conditions.is_empty() {
        config.conditions = conditions;
    }

    if !config.raw_dir.is_dir() {
        return Err(AlignCliError::RawDirMissing(config.raw_dir));
    }

    let report = SessionBatchDriver::new(config).run()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_batch_report(&report);
    }

    Ok(())
}

fn print_batch_report(report: &BatchReport) {
    println!("Batch Report");
    println!("============");
    println!("Run:        {}", report.run_id);
    println!("Processed:  {}", report.processed_count());
    println!("Skipped:    {}", report.skipped_count());

    for reason in [
        SkipReason::NoUsableData,
        SkipReason::FormatError,
        SkipReason::TimestampParseError,
        SkipReason::IoError,
    ] {
        let count = report.skipped_for(reason);
        if count > 0 {
            println!("  {:<22} {}", reason.as_str(), count);
        }
    }

    if !report.skipped.is_empty() {
        println!("\nSkipped sessions:");
        for skipped in &report.skipped {
            println!(
                "  - {}/{} [{}]: {}",
                skipped.condition,
                skipped.subject,
                skipped.reason.as_str(),
                skipped.detail
            );
        }
    }

    match &report.features_path {
        Some(path) => println!("\nFeatures:   {}", path.display()),
        None => println!("\nFeatures:   none (no session processed)"),
    }
}

fn cmd_align(session: &Path, output: &Path, target_hz: f64) -> Result<(), AlignCliError> {
    if !(target_hz.is_finite() && target_hz > 0.0) {
        return Err(AlignCliError::InvalidArgument(format!(
            "target rate must be positive, got {target_hz}"
        )));
    }

    let aligner = SessionAligner::new(PipelineConfig {
        target_hz,
        ..PipelineConfig::default()
    });

    let session_table = match aligner.align_dir(session)? {
        AlignmentOutcome::Aligned(table) => table,
        AlignmentOutcome::NoUsableData => return Err(AlignCliError::NoUsableData),
    };

    if output.to_string_lossy() == "-" {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        write_aligned_to(&session_table, &mut lock)?;
        lock.flush()?;
    } else {
        wearable_align::output::write_aligned_session(&session_table, output)?;
    }

    Ok(())
}

fn cmd_inspect(file: &Path, json: bool) -> Result<(), AlignCliError> {
    let record = load_channel(file)?;

    let report = InspectReport {
        file: file.display().to_string(),
        kind: record.kind().as_str().to_string(),
        rows: record.len(),
        sample_rate_hz: record.sample_rate_hz(),
        start_time: start_time(&record),
        span_seconds: record.time_span().map(|(lo, hi)| hi - lo),
        first_timestamp: record.time_span().map(|(lo, _)| lo),
        last_timestamp: record.time_span().map(|(_, hi)| hi),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Channel:     {}", report.kind);
        println!("File:        {}", report.file);
        println!("Rows:        {}", report.rows);
        println!("Sample rate: {}", fmt_opt(report.sample_rate_hz, "Hz"));
        println!("Start:       {}", fmt_opt(report.start_time, ""));
        println!("Span:        {}", fmt_opt(report.span_seconds, "s"));
    }

    Ok(())
}

fn start_time(record: &ChannelRecord) -> Option<f64> {
    match record {
        ChannelRecord::Scalar(s) => Some(s.start_time),
        ChannelRecord::Acc(a) => Some(a.start_time),
        ChannelRecord::Ibi(i) => Some(i.start_time),
        ChannelRecord::Tags(_) => None,
    }
}

fn fmt_opt(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) if unit.is_empty() => format!("{v}"),
        Some(v) => format!("{v} {unit}"),
        None => "n/a".to_string(),
    }
}

// Error handling

#[derive(Debug)]
enum AlignCliError {
    Io(io::Error),
    Json(serde_json::Error),
    Pipeline(PipelineError),
    MissingDirectories,
    RawDirMissing(PathBuf),
    NoUsableData,
    InvalidArgument(String),
}

impl From<io::Error> for AlignCliError {
    fn from(e: io::Error) -> Self {
        AlignCliError::Io(e)
    }
}

impl From<serde_json::Error> for AlignCliError {
    fn from(e: serde_json::Error) -> Self {
        AlignCliError::Json(e)
    }
}

impl From<PipelineError> for AlignCliError {
    fn from(e: PipelineError) -> Self {
        AlignCliError::Pipeline(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl From<AlignCliError> for CliError {
    fn from(e: AlignCliError) -> Self {
        match e {
            AlignCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            AlignCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the configuration file syntax".to_string()),
            },
            AlignCliError::Pipeline(e) => {
                let code = match &e {
                    PipelineError::Format { .. } | PipelineError::Csv(_) => "FORMAT_ERROR",
                    PipelineError::TimestampParse(_) => "TIMESTAMP_PARSE_ERROR",
                    PipelineError::Io(_) => "IO_ERROR",
                    PipelineError::Json(_) => "JSON_ERROR",
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: None,
                }
            }
            AlignCliError::MissingDirectories => CliError {
                code: "MISSING_DIRECTORIES".to_string(),
                message: "Both --raw-dir and --processed-dir are required without --config"
                    .to_string(),
                hint: None,
            },
            AlignCliError::RawDirMissing(path) => CliError {
                code: "RAW_DIR_MISSING".to_string(),
                message: format!("Raw directory does not exist: {}", path.display()),
                hint: Some("Point --raw-dir at the dataset root".to_string()),
            },
            AlignCliError::NoUsableData => CliError {
                code: "NO_USABLE_DATA".to_string(),
                message: "Session has no channel with a finite time span".to_string(),
                hint: Some("Check that EDA, TEMP, HR, BVP or ACC files are present".to_string()),
            },
            AlignCliError::InvalidArgument(msg) => CliError {
                code: "INVALID_ARGUMENT".to_string(),
                message: msg,
                hint: None,
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct InspectReport {
    file: String,
    kind: String,
    rows: usize,
    sample_rate_hz: Option<f64>,
    start_time: Option<f64>,
    span_seconds: Option<f64>,
    first_timestamp: Option<f64>,
    last_timestamp: Option<f64>,
}
