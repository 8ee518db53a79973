//! Configuration options for a pipeline run.

use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DEFAULT_CHUNK_ROWS: usize = 500_000;
pub const DEFAULT_BATCH_ROWS: usize = 100_000;

/// How the output artifact is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Stream stay-aligned batches when possible, otherwise materialize.
    #[default]
    Auto,
    /// Always build the full frame in memory before writing.
    Materialize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Rows of a raw event table folded per aggregation step.
    pub chunk_rows: usize,
    /// Ask the CSV reader to trade speed for a smaller footprint.
    pub low_memory: bool,
    /// Minimum rows per streamed output batch. Batches end on stay boundaries.
    pub batch_rows: usize,
    pub write_mode: WriteMode,
    /// Value used for a column that has no observation anywhere.
    pub impute_default: f64,
    /// chrono format of every raw timestamp column.
    pub timestamp_format: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunk_rows: DEFAULT_CHUNK_ROWS,
            low_memory: false,
            batch_rows: DEFAULT_BATCH_ROWS,
            write_mode: WriteMode::Auto,
            impute_default: 0.0,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl PipelineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_rows(mut self, rows: usize) -> Self {
        self.chunk_rows = rows;
        self
    }

    pub fn with_low_memory(mut self, enabled: bool) -> Self {
        self.low_memory = enabled;
        self
    }

    pub fn with_batch_rows(mut self, rows: usize) -> Self {
        self.batch_rows = rows;
        self
    }

    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    pub fn with_impute_default(mut self, value: f64) -> Self {
        self.impute_default = value;
        self
    }
}
