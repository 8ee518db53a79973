use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid feature name: {0:?}")]
    InvalidFeatureName(String),
    #[error("unknown aggregation rule: {0}")]
    UnknownRule(String),
    #[error("unknown feature source: {0}")]
    UnknownSource(String),
    #[error("unknown column kind: {0}")]
    UnknownColumnKind(String),
    #[error("feature {name} defined twice for {table}")]
    DuplicateFeature { name: String, table: String },
    #[error("feature {name} belongs to {found}, expected {expected}")]
    SourceMismatch {
        name: String,
        expected: String,
        found: String,
    },
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// A single input row that could not be parsed.
///
/// These are collected and counted, never raised as fatal errors.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("row {row}: cannot parse {column} value {value:?} ({reason})")]
pub struct DataIntegrityError {
    pub row: usize,
    pub column: String,
    pub value: String,
    pub reason: String,
}

impl DataIntegrityError {
    pub fn new(
        row: usize,
        column: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            row,
            column: column.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}
