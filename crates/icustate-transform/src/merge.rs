//! Multi-source merge: full outer join of the hourly source frames on
//! `(stay_id, hour_bin)`, then a left join of the per-stay tables.

use std::collections::{BTreeSet, HashMap};

use icustate_common::i64_column;
use icustate_ingest::StayRegistry;
use icustate_model::columns::{HOUR_BIN, STAY_ID};
use icustate_model::{HourBucket, StayId};
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, TransformError};
use crate::frame::{HourlyFrame, StayFrame, gather_column};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub hourly_sources: usize,
    pub stay_tables: usize,
    pub rows: usize,
    pub stays: usize,
    /// Source rows whose stay is not registered.
    pub dropped_unregistered: usize,
}

/// Joins every source into one frame with a row per distinct key.
///
/// A feature column keeps the value of its own source for a key and is null
/// where that source has no row. Feature names must be unique across all
/// inputs. Output is sorted by key.
pub fn merge_hourly(
    hourly: &[HourlyFrame],
    stay_tables: &[&StayFrame],
    registry: &StayRegistry,
) -> Result<(HourlyFrame, MergeReport)> {
    check_collisions(hourly, stay_tables)?;

    let mut report = MergeReport {
        hourly_sources: hourly.len(),
        stay_tables: stay_tables.len(),
        ..MergeReport::default()
    };

    let mut row_maps = Vec::with_capacity(hourly.len());
    let mut union: BTreeSet<(StayId, HourBucket)> = BTreeSet::new();
    for frame in hourly {
        let keys = frame.keys()?;
        let mut rows = HashMap::with_capacity(keys.len());
        for (row, key) in keys.into_iter().enumerate() {
            if rows.insert(key, row).is_some() {
                return Err(TransformError::DuplicateKey {
                    frame: frame.label().to_string(),
                    stay_id: key.0,
                    hour: key.1,
                });
            }
            if registry.contains(key.0) {
                union.insert(key);
            } else {
                report.dropped_unregistered += 1;
            }
        }
        debug!(source = frame.label(), rows = rows.len(), "source keyed");
        row_maps.push(rows);
    }

    let keys: Vec<(StayId, HourBucket)> = union.into_iter().collect();
    let mut columns = vec![
        i64_column(STAY_ID, keys.iter().map(|(stay, _)| Some(*stay)).collect()),
        i64_column(HOUR_BIN, keys.iter().map(|(_, hour)| Some(hour.as_millis())).collect()),
    ];

    for (frame, rows) in hourly.iter().zip(&row_maps) {
        let indices: Vec<Option<usize>> = keys.iter().map(|key| rows.get(key).copied()).collect();
        for name in frame.feature_names() {
            columns.push(gather_column(frame.data().column(&name)?, &indices)?);
        }
    }

    for table in stay_tables {
        let index = table.index()?;
        let indices: Vec<Option<usize>> = keys
            .iter()
            .map(|(stay, _)| index.get(stay).copied())
            .collect();
        for name in table.feature_names() {
            columns.push(gather_column(table.data().column(&name)?, &indices)?);
        }
    }

    report.rows = keys.len();
    report.stays = keys
        .iter()
        .map(|(stay, _)| *stay)
        .collect::<BTreeSet<_>>()
        .len();
    info!(
        rows = report.rows,
        stays = report.stays,
        dropped_unregistered = report.dropped_unregistered,
        "sources merged"
    );
    let frame = HourlyFrame::new("merged", DataFrame::new(columns)?)?;
    Ok((frame, report))
}

fn check_collisions(hourly: &[HourlyFrame], stay_tables: &[&StayFrame]) -> Result<()> {
    let mut owners: HashMap<String, String> = HashMap::new();
    let named = hourly
        .iter()
        .map(|f| (f.label(), f.feature_names()))
        .chain(stay_tables.iter().map(|t| (t.label(), t.feature_names())));
    for (label, names) in named {
        for name in names {
            if let Some(first) = owners.get(&name) {
                return Err(TransformError::ColumnCollision {
                    column: name,
                    first: first.clone(),
                    second: label.to_string(),
                });
            }
            owners.insert(name, label.to_string());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use icustate_common::{f64_column, f64_values, i32_column, i32_values};
    use icustate_model::{MILLIS_PER_HOUR, Stay};

    fn registry() -> StayRegistry {
        let intime = NaiveDate::from_ymd_opt(2150, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        StayRegistry::from_stays([1, 2].map(|stay_id| Stay {
            stay_id,
            hadm_id: stay_id * 10,
            subject_id: stay_id * 100,
            intime,
            outtime: intime + chrono::Duration::hours(48),
            demographics: Default::default(),
        }))
    }

    fn hourly(label: &str, rows: &[(i64, i64)], name: &str, values: &[f64]) -> HourlyFrame {
        let data = DataFrame::new(vec![
            i64_column(STAY_ID, rows.iter().map(|r| Some(r.0)).collect()),
            i64_column(HOUR_BIN, rows.iter().map(|r| Some(r.1 * MILLIS_PER_HOUR)).collect()),
            f64_column(name, values.iter().copied().map(Some).collect()),
        ])
        .unwrap();
        HourlyFrame::new(label, data).unwrap()
    }

    #[test]
    fn outer_join_keeps_each_source_nulls() {
        let vitals = hourly("vitals", &[(1, 0), (1, 2)], "heart_rate", &[80.0, 90.0]);
        let labs = hourly("labs", &[(1, 2), (2, 1), (9, 0)], "lactate", &[1.5, 2.0, 3.0]);
        let (merged, report) = merge_hourly(&[vitals, labs], &[], &registry()).unwrap();
        assert_eq!(merged.height(), 3);
        assert_eq!(
            merged.f64_or_null("heart_rate").unwrap(),
            vec![Some(80.0), Some(90.0), None]
        );
        assert_eq!(
            f64_values(merged.data(), "lactate").unwrap(),
            vec![None, Some(1.5), Some(2.0)]
        );
        assert_eq!(report.dropped_unregistered, 1);
        assert_eq!(report.stays, 2);
    }

    #[test]
    fn stay_tables_are_left_joined() {
        let vitals = hourly("vitals", &[(1, 0), (1, 1), (2, 0)], "heart_rate", &[1.0, 2.0, 3.0]);
        let flags = StayFrame::new(
            "attributes",
            DataFrame::new(vec![
                i64_column(STAY_ID, vec![Some(1), Some(3)]),
                i32_column("icu_readmission", vec![Some(1), Some(0)]),
            ])
            .unwrap(),
        )
        .unwrap();
        let (merged, _) = merge_hourly(&[vitals], &[&flags], &registry()).unwrap();
        assert_eq!(
            i32_values(merged.data(), "icu_readmission").unwrap(),
            vec![Some(1), Some(1), None]
        );
    }

    #[test]
    fn shared_feature_name_is_rejected() {
        let a = hourly("vitals", &[(1, 0)], "heart_rate", &[1.0]);
        let b = hourly("labs", &[(1, 0)], "heart_rate", &[2.0]);
        let err = merge_hourly(&[a, b], &[], &registry()).unwrap_err();
        assert!(matches!(err, TransformError::ColumnCollision { ref column, .. } if column == "heart_rate"));
    }

    #[test]
    fn repeated_key_in_a_source_is_rejected() {
        let a = hourly("vitals", &[(1, 0), (1, 0)], "heart_rate", &[1.0, 2.0]);
        assert!(matches!(
            merge_hourly(&[a], &[], &registry()),
            Err(TransformError::DuplicateKey { stay_id: 1, .. })
        ));
    }
}
