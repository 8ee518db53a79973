use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("data directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("required table {table} not found under {root}")]
    MissingRequired { table: String, root: PathBuf },

    #[error("table {table} has no column {column}")]
    MissingColumn { table: String, column: String },

    #[error("failed to read {table} from {path}: {source}")]
    Read {
        table: String,
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

pub type Result<T> = std::result::Result<T, IngestError>;
