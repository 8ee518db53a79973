//! Two-tier write strategy: stream when possible, materialize otherwise.

use std::path::Path;

use icustate_model::{FallbackReason, PipelineOptions, StrategySelection, WriteMode, WriteReport};
use icustate_transform::HourlyFrame;
use tracing::{info, warn};

use crate::error::{OutputError, Result};
use crate::executor::{MaterializedParquetWriter, StreamingParquetWriter, WriteExecutor};
use crate::finalizer::BatchFinalizer;

pub struct Materializer {
    preferred: Box<dyn WriteExecutor>,
    fallback: Box<dyn WriteExecutor>,
    mode: WriteMode,
}

impl Materializer {
    pub fn new(preferred: Box<dyn WriteExecutor>, fallback: Box<dyn WriteExecutor>, mode: WriteMode) -> Self {
        Self {
            preferred,
            fallback,
            mode,
        }
    }

    /// Streaming Parquet with `batch_rows` batches, falling back to a
    /// materialized write.
    pub fn from_options(options: &PipelineOptions) -> Self {
        Self::new(
            Box::new(StreamingParquetWriter::new(options.batch_rows)),
            Box::new(MaterializedParquetWriter),
            options.write_mode,
        )
    }

    /// Writes `frame` and reports which executor produced the file.
    ///
    /// Any failure of the preferred executor hands the frame to the
    /// fallback; only a fallback failure is returned as an error.
    pub fn write(
        &self,
        frame: &HourlyFrame,
        finalizer: &dyn BatchFinalizer,
        path: &Path,
    ) -> Result<WriteReport> {
        let reason = match self.mode {
            WriteMode::Materialize => FallbackReason::Requested,
            WriteMode::Auto => match self.preferred.write(frame, finalizer, path) {
                Ok(outcome) => {
                    let selection = StrategySelection::preferred(self.preferred.kind());
                    info!(strategy = %selection.chosen, rows = outcome.rows, batches = outcome.batches, "state table written");
                    return Ok(WriteReport {
                        path: path.to_path_buf(),
                        rows: outcome.rows,
                        batches: outcome.batches,
                        selection,
                    });
                }
                Err(OutputError::NotStreamable(reason)) => reason,
                Err(err) => FallbackReason::StreamingFailed(err.to_string()),
            },
        };

        let selection = StrategySelection::fallback(self.fallback.kind(), reason);
        if let Some(reason) = &selection.fallback_reason {
            warn!(strategy = %selection.chosen, %reason, "falling back to materialized write");
        }
        let outcome = self.fallback.write(frame, finalizer, path)?;
        info!(strategy = %selection.chosen, rows = outcome.rows, batches = outcome.batches, "state table written");
        Ok(WriteReport {
            path: path.to_path_buf(),
            rows: outcome.rows,
            batches: outcome.batches,
            selection,
        })
    }
}
