//! Command-line arguments of the `icustate` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "icustate",
    version,
    about = "Build an hourly ICU state table from raw event logs",
    long_about = "Build a dense, hourly-binned feature table from raw ICU event tables.\n\n\
                  Reads icustays, chartevents, labevents, outputevents, inputevents,\n\
                  diagnoses_icd, patients, admissions and omr (CSV, optionally gzipped)\n\
                  and writes one Parquet file keyed by (stay_id, hour_bin)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for humans, json for machines).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow row-level values (stay ids, raw cells) in trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the pipeline over a data directory and write the state table.
    Build(BuildArgs),

    /// List the configured features by source.
    Features(StandardsArgs),

    /// Verify the standards directory against its manifest.
    Standards(StandardsArgs),
}

#[derive(Parser)]
pub struct BuildArgs {
    /// Directory holding the raw tables (icustays.csv[.gz], ...).
    #[arg(value_name = "DATA_DIR")]
    pub data_dir: PathBuf,

    /// Output Parquet file (default: <DATA_DIR>/state.parquet).
    #[arg(long = "output", short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Standards directory (default: $ICUSTATE_STANDARDS_DIR or the bundled one).
    #[arg(long = "standards-dir", value_name = "DIR")]
    pub standards_dir: Option<PathBuf>,

    /// TOML file with pipeline options; flags override its values.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Raw rows folded per aggregation step.
    #[arg(long = "chunk-rows", value_name = "ROWS")]
    pub chunk_rows: Option<usize>,

    /// Parse raw tables in low memory mode.
    #[arg(long = "low-memory")]
    pub low_memory: bool,

    /// Minimum rows per streamed output batch.
    #[arg(long = "batch-rows", value_name = "ROWS")]
    pub batch_rows: Option<usize>,

    /// Build the whole table in memory instead of streaming batches.
    #[arg(long = "materialize")]
    pub materialize: bool,

    /// Value for columns that have no observation anywhere.
    #[arg(long = "impute-default", value_name = "VALUE")]
    pub impute_default: Option<f64>,

    /// chrono format of the raw timestamp columns.
    #[arg(long = "timestamp-format", value_name = "FORMAT")]
    pub timestamp_format: Option<String>,

    /// Also write the run report as JSON.
    #[arg(long = "report", value_name = "FILE")]
    pub report: Option<PathBuf>,
}

#[derive(Parser)]
pub struct StandardsArgs {
    /// Standards directory (default: $ICUSTATE_STANDARDS_DIR or the bundled one).
    #[arg(long = "standards-dir", value_name = "DIR")]
    pub standards_dir: Option<PathBuf>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
