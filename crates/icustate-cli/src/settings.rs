//! Pipeline options from a TOML file plus command-line overrides.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use icustate_model::{PipelineOptions, WriteMode};

/// Values given on the command line. `None` keeps the file or default value.
#[derive(Debug, Clone, Default)]
pub struct OptionOverrides {
    pub chunk_rows: Option<usize>,
    pub batch_rows: Option<usize>,
    pub low_memory: bool,
    pub materialize: bool,
    pub impute_default: Option<f64>,
    pub timestamp_format: Option<String>,
}

impl OptionOverrides {
    pub fn apply(self, mut options: PipelineOptions) -> PipelineOptions {
        if let Some(rows) = self.chunk_rows {
            options.chunk_rows = rows;
        }
        if let Some(rows) = self.batch_rows {
            options.batch_rows = rows;
        }
        if self.low_memory {
            options.low_memory = true;
        }
        if self.materialize {
            options.write_mode = WriteMode::Materialize;
        }
        if let Some(value) = self.impute_default {
            options.impute_default = value;
        }
        if let Some(format) = self.timestamp_format {
            options.timestamp_format = format;
        }
        options
    }
}

/// Reads options from `path`; missing keys take their defaults.
///
/// Without a path the defaults are returned. A file that was named but cannot
/// be read or parsed is an error.
pub fn load_options(path: Option<&Path>) -> Result<PipelineOptions> {
    let Some(path) = path else {
        return Ok(PipelineOptions::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let options: PipelineOptions =
        toml::from_str(&content).with_context(|| format!("parse config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded pipeline options");
    Ok(options)
}
