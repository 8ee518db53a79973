//! Writes the finalized state table as Parquet.
//!
//! The [`Materializer`] tries the [`StreamingParquetWriter`] first and falls
//! back to the [`MaterializedParquetWriter`]; the choice and its reason are
//! returned in the [`WriteReport`](icustate_model::WriteReport).

pub mod error;
pub mod executor;
pub mod finalizer;
mod fs;
pub mod materializer;

pub use error::{OutputError, Result};
pub use executor::{MaterializedParquetWriter, StreamingParquetWriter, WriteExecutor, WriteOutcome};
pub use finalizer::BatchFinalizer;
pub use materializer::Materializer;
