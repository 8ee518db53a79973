use icustate_ingest::IngestError;
use icustate_model::{HourBucket, StayId};
use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("column {column} is produced by both {first} and {second}")]
    ColumnCollision {
        column: String,
        first: String,
        second: String,
    },

    #[error("{frame} has no key column {column}")]
    MissingKey { frame: String, column: String },

    #[error("{frame} has a null key at row {row}")]
    NullKey { frame: String, row: usize },

    #[error("{frame} has more than one row for stay {stay_id} at {hour}")]
    DuplicateKey {
        frame: String,
        stay_id: StayId,
        hour: HourBucket,
    },

    #[error("{frame} has more than one row for stay {stay_id}")]
    DuplicateStay { frame: String, stay_id: StayId },

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

pub type Result<T> = std::result::Result<T, TransformError>;
