//! Forward-fill then median imputation.
//!
//! The frame is sorted by `(stay_id, hour_bin)` first. Numeric columns are
//! carried forward within each stay and the remaining nulls take the
//! column's median. Text columns are only carried forward.

use std::collections::BTreeMap;
use std::ops::Range;

use icustate_common::{f64_column, i32_column, i64_column};
use icustate_model::{ImputationReport, ImputationWarning};
use polars::prelude::{Column, DataType, NamedFrom, Series};
use tracing::{info, warn};

use crate::error::Result;
use crate::fill::{fill_nulls, forward_fill, median};
use crate::frame::HourlyFrame;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImputationPolicy {
    /// Value for a numeric column with no observation at all.
    default: f64,
}

impl ImputationPolicy {
    pub fn new(default: f64) -> Self {
        Self { default }
    }
}

/// Imputes every feature column of `frame`.
pub fn impute(frame: HourlyFrame, policy: &ImputationPolicy) -> Result<(HourlyFrame, ImputationReport)> {
    let frame = frame.sort_by_key()?;
    let partitions = frame.partitions()?;
    let mut report = ImputationReport::default();
    let mut data = frame.data().clone();

    for name in frame.feature_names() {
        let column = data.column(&name)?;
        let imputed: Column = match column.dtype() {
            DataType::String => {
                let mut values: Vec<Option<String>> = column
                    .str()?
                    .into_iter()
                    .map(|v| v.map(str::to_string))
                    .collect();
                let filled = forward_fill(&mut values, &partitions);
                record(&mut report.forward_filled, &name, filled);
                Series::new(name.as_str().into(), values).into()
            }
            DataType::Int32 => {
                let values: Vec<Option<f64>> = column
                    .i32()?
                    .into_iter()
                    .map(|v| v.map(f64::from))
                    .collect();
                let values = impute_numeric(&name, values, &partitions, policy, &mut report);
                i32_column(&name, values.into_iter().map(|v| v.map(round_i32)).collect())
            }
            DataType::Int64 => {
                let values: Vec<Option<f64>> = column
                    .i64()?
                    .into_iter()
                    .map(|v| v.map(|v| v as f64))
                    .collect();
                let values = impute_numeric(&name, values, &partitions, policy, &mut report);
                i64_column(&name, values.into_iter().map(|v| v.map(|v| v.round() as i64)).collect())
            }
            DataType::Float64 | DataType::Float32 | DataType::UInt32 | DataType::UInt64 => {
                let cast = column.cast(&DataType::Float64)?;
                let values: Vec<Option<f64>> = cast.f64()?.into_iter().collect();
                f64_column(
                    &name,
                    impute_numeric(&name, values, &partitions, policy, &mut report),
                )
            }
            _ => continue,
        };
        data.with_column(imputed)?;
    }

    for warning in &report.warnings {
        warn!(column = %warning.column, rows = warning.rows, default = warning.default, "column had no observations");
    }
    info!(
        rows = data.height(),
        filled = report.total_filled(),
        warnings = report.warnings.len(),
        "imputation complete"
    );
    Ok((frame.with_data(data)?, report))
}

fn impute_numeric(
    name: &str,
    mut values: Vec<Option<f64>>,
    partitions: &[Range<usize>],
    policy: &ImputationPolicy,
    report: &mut ImputationReport,
) -> Vec<Option<f64>> {
    let carried = forward_fill(&mut values, partitions);
    record(&mut report.forward_filled, name, carried);
    match median(&values) {
        Some(median) => {
            let filled = fill_nulls(&mut values, median);
            record(&mut report.median_filled, name, filled);
        }
        None => {
            let rows = fill_nulls(&mut values, policy.default);
            if rows > 0 {
                report.warnings.push(ImputationWarning {
                    column: name.to_string(),
                    rows,
                    default: policy.default,
                });
            }
        }
    }
    values
}

fn record(counts: &mut BTreeMap<String, usize>, name: &str, filled: usize) {
    if filled > 0 {
        *counts.entry(name.to_string()).or_default() += filled;
    }
}

fn round_i32(value: f64) -> i32 {
    value.round() as i32
}
