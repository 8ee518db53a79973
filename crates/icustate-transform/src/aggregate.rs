//! The conditional aggregation engine.
//!
//! One pass over the events of a source folds every row into a single
//! accumulator row per group, with one running aggregate per feature. A row
//! only touches the features whose item-id set contains its item, so the
//! result equals one aggregation per feature followed by an outer join on
//! the group key, without ever building the per-feature tables.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use icustate_common::{f64_column, i64_column};
use icustate_model::columns::{HOUR_BIN, STAY_ID};
use icustate_model::{AggregationRule, FeatureMap, HourBucket, StayId};
use polars::prelude::{Column, DataFrame};

use crate::error::Result;

/// Grouping key of an aggregation.
pub trait GroupKey: Copy + Ord + Hash + Debug {
    /// Key columns for `keys`, in order.
    fn key_columns(keys: &[Self]) -> Vec<Column>;
}

/// Hourly grouping: one row per stay and hour bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StayHourKey {
    pub stay_id: StayId,
    pub hour: HourBucket,
}

impl StayHourKey {
    pub fn new(stay_id: StayId, hour: HourBucket) -> Self {
        Self { stay_id, hour }
    }
}

impl GroupKey for StayHourKey {
    fn key_columns(keys: &[Self]) -> Vec<Column> {
        vec![
            i64_column(STAY_ID, keys.iter().map(|k| Some(k.stay_id)).collect()),
            i64_column(HOUR_BIN, keys.iter().map(|k| Some(k.hour.as_millis())).collect()),
        ]
    }
}

/// Per-stay grouping, for time-independent attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StayKey(pub StayId);

impl GroupKey for StayKey {
    fn key_columns(keys: &[Self]) -> Vec<Column> {
        vec![i64_column(STAY_ID, keys.iter().map(|k| Some(k.0)).collect())]
    }
}

/// One parsed event ready to be folded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation<K> {
    pub key: K,
    pub item_id: i64,
    pub value: f64,
    /// Event time in epoch milliseconds, used by `first`.
    pub at_ms: i64,
}

#[derive(Debug, Clone, Copy)]
enum Accumulator {
    Mean { sum: f64, count: u32 },
    Sum(Option<f64>),
    First(Option<(i64, f64)>),
    Total(f64),
}

impl Accumulator {
    fn new(rule: AggregationRule) -> Self {
        match rule {
            AggregationRule::Mean => Accumulator::Mean { sum: 0.0, count: 0 },
            AggregationRule::Sum => Accumulator::Sum(None),
            AggregationRule::First => Accumulator::First(None),
            AggregationRule::Total => Accumulator::Total(0.0),
        }
    }

    fn update(&mut self, value: f64, at_ms: i64) {
        match self {
            Accumulator::Mean { sum, count } => {
                *sum += value;
                *count += 1;
            }
            Accumulator::Sum(sum) => *sum = Some(sum.unwrap_or(0.0) + value),
            Accumulator::First(slot) => match slot {
                // Ties keep the row seen first.
                Some((earliest, _)) if *earliest <= at_ms => {}
                _ => *slot = Some((at_ms, value)),
            },
            Accumulator::Total(total) => *total += value,
        }
    }

    fn finish(self) -> Option<f64> {
        match self {
            Accumulator::Mean { count: 0, .. } => None,
            Accumulator::Mean { sum, count } => Some(sum / f64::from(count)),
            Accumulator::Sum(sum) => sum,
            Accumulator::First(slot) => slot.map(|(_, value)| value),
            Accumulator::Total(total) => Some(total),
        }
    }
}

/// Folds observations of one source into one row per group.
#[derive(Debug)]
pub struct ConditionalAggregator<'a, K: GroupKey> {
    features: &'a FeatureMap,
    groups: HashMap<K, Vec<Accumulator>>,
}

impl<'a, K: GroupKey> ConditionalAggregator<'a, K> {
    pub fn new(features: &'a FeatureMap) -> Self {
        Self {
            features,
            groups: HashMap::new(),
        }
    }

    /// Folds one observation. Returns false, leaving the state untouched,
    /// when no feature lists the item.
    pub fn fold(&mut self, observation: Observation<K>) -> bool {
        let targets = self.features.features_for(observation.item_id);
        if targets.is_empty() {
            return false;
        }
        let features = self.features;
        let row = self.groups.entry(observation.key).or_insert_with(|| {
            features
                .features()
                .iter()
                .map(|f| Accumulator::new(f.rule))
                .collect()
        });
        for &index in targets {
            row[index].update(observation.value, observation.at_ms);
        }
        true
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Final values of every group in ascending key order.
    pub fn finish_rows(self) -> Vec<(K, Vec<Option<f64>>)> {
        let mut rows: Vec<(K, Vec<Option<f64>>)> = self
            .groups
            .into_iter()
            .map(|(key, row)| (key, row.into_iter().map(Accumulator::finish).collect()))
            .collect();
        rows.sort_unstable_by_key(|(key, _)| *key);
        rows
    }

    /// Key columns followed by one Float64 column per feature, sorted by key.
    pub fn finish(self) -> Result<DataFrame> {
        let names: Vec<String> = self.features.names().map(str::to_string).collect();
        let rows = self.finish_rows();
        let keys: Vec<K> = rows.iter().map(|(key, _)| *key).collect();
        let mut columns = K::key_columns(&keys);
        for (index, name) in names.iter().enumerate() {
            let values = rows.iter().map(|(_, row)| row[index]).collect();
            columns.push(f64_column(name, values));
        }
        Ok(DataFrame::new(columns)?)
    }
}
