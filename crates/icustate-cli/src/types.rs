use std::path::PathBuf;

use icustate_model::{ExtractStats, FallbackReason, ImputationReport, PipelineOptions, WriteReport};
use icustate_standards::VerifySummary;
use icustate_transform::{AttributeReport, MergeReport};
use serde::Serialize;

/// Everything a `build` run reports, in stage order.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub data_dir: PathBuf,
    pub options: PipelineOptions,
    pub standards: VerifySummary,
    pub registry: RegistrySummary,
    /// One entry per raw source, including absent ones.
    pub sources: Vec<ExtractStats>,
    pub attributes: AttributeReport,
    pub merge: MergeReport,
    pub imputation: ImputationReport,
    /// Schema columns no stage produced; written with the default value.
    pub absent_columns: Vec<String>,
    pub write: WriteReport,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrySummary {
    pub rows_read: usize,
    pub stays: usize,
    pub dropped: usize,
}

impl RunResult {
    /// True when the run finished but rows or columns were lost along the way.
    pub fn has_warnings(&self) -> bool {
        self.registry.dropped > 0
            || self.sources.iter().any(|s| s.dropped() > 0)
            || !self.imputation.warnings.is_empty()
            || self
                .write
                .selection
                .fallback_reason
                .as_ref()
                .is_some_and(|reason| *reason != FallbackReason::Requested)
    }
}
