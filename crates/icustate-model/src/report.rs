//! Run-level reports surfaced in the summary.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Row accounting for one source extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractStats {
    pub source: String,
    /// True when the raw table was absent or empty.
    pub missing: bool,
    pub rows_read: usize,
    pub rows_selected: usize,
    pub malformed: usize,
    pub unresolved: usize,
    pub out_of_window: usize,
    pub groups: usize,
}

impl ExtractStats {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn missing(source: impl Into<String>) -> Self {
        Self {
            missing: true,
            ..Self::new(source)
        }
    }

    pub fn dropped(&self) -> usize {
        self.malformed + self.unresolved + self.out_of_window
    }

    pub fn absorb(&mut self, other: &ExtractStats) {
        self.rows_read += other.rows_read;
        self.rows_selected += other.rows_selected;
        self.malformed += other.malformed;
        self.unresolved += other.unresolved;
        self.out_of_window += other.out_of_window;
    }
}

/// A column that had no observation anywhere and received the default.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImputationWarning {
    pub column: String,
    pub rows: usize,
    pub default: f64,
}

impl fmt::Display for ImputationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} has no observed values; {} rows set to {}",
            self.column, self.rows, self.default
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImputationReport {
    pub forward_filled: BTreeMap<String, usize>,
    pub median_filled: BTreeMap<String, usize>,
    pub warnings: Vec<ImputationWarning>,
}

impl ImputationReport {
    pub fn total_filled(&self) -> usize {
        self.forward_filled.values().sum::<usize>()
            + self.median_filled.values().sum::<usize>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteStrategyKind {
    Streaming,
    Materialized,
}

impl fmt::Display for WriteStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteStrategyKind::Streaming => f.write_str("streaming"),
            WriteStrategyKind::Materialized => f.write_str("materialized"),
        }
    }
}

/// Why the preferred streaming writer was not used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    /// Materialization was requested explicitly.
    Requested,
    UnsortedKeys,
    DuplicateKeys,
    ZeroBatchSize,
    StreamingFailed(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Requested => f.write_str("materialization requested"),
            FallbackReason::UnsortedKeys => f.write_str("rows are not sorted by stay and hour"),
            FallbackReason::DuplicateKeys => f.write_str("duplicate stay/hour keys"),
            FallbackReason::ZeroBatchSize => f.write_str("batch size is zero"),
            FallbackReason::StreamingFailed(message) => {
                write!(f, "streaming write failed: {message}")
            }
        }
    }
}

/// Observable outcome of the write strategy choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategySelection {
    pub chosen: WriteStrategyKind,
    pub fallback_reason: Option<FallbackReason>,
}

impl StrategySelection {
    pub fn preferred(chosen: WriteStrategyKind) -> Self {
        Self {
            chosen,
            fallback_reason: None,
        }
    }

    pub fn fallback(chosen: WriteStrategyKind, reason: FallbackReason) -> Self {
        Self {
            chosen,
            fallback_reason: Some(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub path: PathBuf,
    pub rows: usize,
    pub batches: usize,
    pub selection: StrategySelection,
}
