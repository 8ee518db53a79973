//! Parquet write executors.

use std::ops::Range;
use std::path::Path;

use icustate_model::{FallbackReason, WriteStrategyKind};
use icustate_transform::{HourlyFrame, KeyOrder};
use polars::prelude::ParquetWriter;
use tracing::debug;

use crate::error::{OutputError, Result};
use crate::finalizer::BatchFinalizer;
use crate::fs::{commit, create, discard, ensure_parent_dir, partial_path};

/// Rows and batches one executor wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub rows: usize,
    pub batches: usize,
}

/// One way of writing the finalized state table to `path`.
///
/// Executors write to a sibling `.partial` file and rename it into place, so
/// a failed attempt never leaves a truncated output behind.
pub trait WriteExecutor {
    fn kind(&self) -> WriteStrategyKind;

    fn write(
        &self,
        frame: &HourlyFrame,
        finalizer: &dyn BatchFinalizer,
        path: &Path,
    ) -> Result<WriteOutcome>;
}

/// Finalizes and writes stay-aligned row batches through a batched Parquet
/// writer, so only one finalized batch is resident at a time.
#[derive(Debug, Clone, Copy)]
pub struct StreamingParquetWriter {
    batch_rows: usize,
}

impl StreamingParquetWriter {
    pub fn new(batch_rows: usize) -> Self {
        Self { batch_rows }
    }

    /// Row ranges of the batches to write.
    ///
    /// A batch never splits a stay; a stay longer than `batch_rows` forms a
    /// batch of its own. Fails with [`OutputError::NotStreamable`] when the
    /// frame is not sorted by unique keys or the batch size is zero.
    pub fn plan(&self, frame: &HourlyFrame) -> Result<Vec<Range<usize>>> {
        if self.batch_rows == 0 {
            return Err(OutputError::NotStreamable(FallbackReason::ZeroBatchSize));
        }
        match frame.key_order()? {
            KeyOrder::SortedUnique => {}
            KeyOrder::Unsorted => return Err(OutputError::NotStreamable(FallbackReason::UnsortedKeys)),
            KeyOrder::Duplicates => {
                return Err(OutputError::NotStreamable(FallbackReason::DuplicateKeys));
            }
        }

        let mut batches = Vec::new();
        let mut start = 0;
        let mut end = 0;
        for stay in frame.partitions()? {
            if end > start && stay.end - start > self.batch_rows {
                batches.push(start..end);
                start = end;
            }
            end = stay.end;
        }
        if end > start {
            batches.push(start..end);
        }
        Ok(batches)
    }

    fn write_batches(
        &self,
        frame: &HourlyFrame,
        finalizer: &dyn BatchFinalizer,
        batches: &[Range<usize>],
        path: &Path,
    ) -> Result<WriteOutcome> {
        let file = create(path)?;
        let slice = |range: &Range<usize>| frame.data().slice(range.start as i64, range.len());

        let Some((first, rest)) = batches.split_first() else {
            let mut empty = finalizer.finalize_batch(frame.data())?;
            ParquetWriter::new(file).finish(&mut empty)?;
            return Ok(WriteOutcome { rows: 0, batches: 0 });
        };

        let head = finalizer.finalize_batch(&slice(first))?;
        let schema = head.schema().clone();
        let mut writer = ParquetWriter::new(file).batched(&schema)?;
        writer.write_batch(&head)?;
        let mut rows = head.height();
        drop(head);

        for (index, range) in rest.iter().enumerate() {
            let batch = finalizer.finalize_batch(&slice(range))?;
            writer.write_batch(&batch)?;
            rows += batch.height();
            debug!(batch = index + 1, rows = batch.height(), "batch written");
        }
        writer.finish()?;
        Ok(WriteOutcome {
            rows,
            batches: batches.len(),
        })
    }
}

impl WriteExecutor for StreamingParquetWriter {
    fn kind(&self) -> WriteStrategyKind {
        WriteStrategyKind::Streaming
    }

    fn write(
        &self,
        frame: &HourlyFrame,
        finalizer: &dyn BatchFinalizer,
        path: &Path,
    ) -> Result<WriteOutcome> {
        let batches = self.plan(frame)?;
        ensure_parent_dir(path)?;
        let partial = partial_path(path);
        match self.write_batches(frame, finalizer, &batches, &partial) {
            Ok(outcome) => {
                commit(&partial, path)?;
                Ok(outcome)
            }
            Err(err) => {
                discard(&partial);
                Err(err)
            }
        }
    }
}

/// Sorts and finalizes the whole frame, then writes it in one call.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaterializedParquetWriter;

impl WriteExecutor for MaterializedParquetWriter {
    fn kind(&self) -> WriteStrategyKind {
        WriteStrategyKind::Materialized
    }

    fn write(
        &self,
        frame: &HourlyFrame,
        finalizer: &dyn BatchFinalizer,
        path: &Path,
    ) -> Result<WriteOutcome> {
        let sorted = frame.clone().sort_by_key()?;
        let mut out = finalizer.finalize_batch(sorted.data())?;
        ensure_parent_dir(path)?;
        let partial = partial_path(path);
        let written = create(&partial).and_then(|file| {
            ParquetWriter::new(file).finish(&mut out)?;
            Ok(())
        });
        if let Err(err) = written {
            discard(&partial);
            return Err(err);
        }
        commit(&partial, path)?;
        Ok(WriteOutcome {
            rows: out.height(),
            batches: 1,
        })
    }
}
