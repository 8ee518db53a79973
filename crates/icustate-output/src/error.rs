use std::io;
use std::path::PathBuf;

use icustate_model::FallbackReason;
use icustate_transform::TransformError;
use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    /// The streaming writer cannot handle this frame; nothing was written.
    #[error("cannot stream: {0}")]
    NotStreamable(FallbackReason),

    #[error("{action} {path}: {error}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        error: io::Error,
    },

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

impl OutputError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, error: io::Error) -> Self {
        OutputError::Io {
            action,
            path: path.into(),
            error,
        }
    }
}

pub type Result<T> = std::result::Result<T, OutputError>;
