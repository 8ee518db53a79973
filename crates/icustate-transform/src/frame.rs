//! Keyed frame types passed between stages.
//!
//! [`HourlyFrame`] wraps a Polars DataFrame keyed by `(stay_id, hour_bin)`,
//! with `hour_bin` held as epoch milliseconds. [`StayFrame`] holds
//! time-independent per-stay attributes keyed by `stay_id` alone. Both are
//! immutable: every stage returns a new frame.

use std::collections::HashMap;
use std::ops::Range;

use icustate_common::{f64_column, f64_values, i32_column, i64_column};
use icustate_model::columns::{HOUR_BIN, STAY_ID};
use icustate_model::{HourBucket, StayId};
use polars::prelude::{
    Column, DataFrame, DataType, IdxCa, IdxSize, NamedFrom, NewChunkedArray, Series,
};

use crate::error::{Result, TransformError};

/// Key layout of an hourly frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrder {
    SortedUnique,
    Unsorted,
    Duplicates,
}

#[derive(Debug, Clone)]
pub struct HourlyFrame {
    label: String,
    data: DataFrame,
}

impl HourlyFrame {
    /// Wraps `data`, casting the key columns to Int64.
    pub fn new(label: impl Into<String>, data: DataFrame) -> Result<Self> {
        let label = label.into();
        let data = cast_keys(&label, data, &[STAY_ID, HOUR_BIN])?;
        Ok(Self { label, data })
    }

    /// A frame with no rows and all-null Float64 feature columns.
    pub fn empty<'a>(
        label: impl Into<String>,
        features: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self> {
        let mut columns = vec![i64_column(STAY_ID, Vec::new()), i64_column(HOUR_BIN, Vec::new())];
        columns.extend(features.into_iter().map(|name| f64_column(name, Vec::new())));
        Ok(Self {
            label: label.into(),
            data: DataFrame::new(columns)?,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    pub fn into_data(self) -> DataFrame {
        self.data
    }

    pub fn height(&self) -> usize {
        self.data.height()
    }

    pub fn is_empty(&self) -> bool {
        self.data.height() == 0
    }

    /// Same label, new contents.
    pub fn with_data(&self, data: DataFrame) -> Result<Self> {
        Self::new(self.label.clone(), data)
    }

    /// Non-key column names in frame order.
    pub fn feature_names(&self) -> Vec<String> {
        non_key_names(&self.data, &[STAY_ID, HOUR_BIN])
    }

    pub fn keys(&self) -> Result<Vec<(StayId, HourBucket)>> {
        let stays = self.data.column(STAY_ID)?.i64()?;
        let hours = self.data.column(HOUR_BIN)?.i64()?;
        stays
            .into_iter()
            .zip(hours.into_iter())
            .enumerate()
            .map(|(row, key)| match key {
                (Some(stay), Some(hour)) => Ok((stay, HourBucket::from_millis(hour))),
                _ => Err(TransformError::NullKey {
                    frame: self.label.clone(),
                    row,
                }),
            })
            .collect()
    }

    pub fn key_order(&self) -> Result<KeyOrder> {
        Ok(key_order(&self.keys()?))
    }

    /// Stable ascending sort by `(stay_id, hour_bin)`.
    pub fn sort_by_key(self) -> Result<Self> {
        let keys = self.keys()?;
        if keys.windows(2).all(|w| w[0] <= w[1]) {
            return Ok(self);
        }
        let mut order: Vec<IdxSize> = (0..keys.len() as IdxSize).collect();
        order.sort_by_key(|&row| keys[row as usize]);
        let indices = IdxCa::from_vec("row".into(), order);
        let data = self.data.take(&indices)?;
        Ok(Self {
            label: self.label,
            data,
        })
    }

    /// Contiguous row ranges of each stay. The frame must be sorted by key.
    pub fn partitions(&self) -> Result<Vec<Range<usize>>> {
        let stays = self.data.column(STAY_ID)?.i64()?;
        let mut ranges = Vec::new();
        let mut start = 0;
        let mut current: Option<Option<i64>> = None;
        for (row, stay) in stays.into_iter().enumerate() {
            match current {
                Some(previous) if previous == stay => {}
                Some(_) => {
                    ranges.push(start..row);
                    start = row;
                    current = Some(stay);
                }
                None => current = Some(stay),
            }
        }
        if current.is_some() {
            ranges.push(start..self.data.height());
        }
        Ok(ranges)
    }

    /// Values of a feature as `f64`; an absent column reads as all null.
    pub fn f64_or_null(&self, name: &str) -> Result<Vec<Option<f64>>> {
        if self.data.column(name).is_err() {
            return Ok(vec![None; self.height()]);
        }
        Ok(f64_values(&self.data, name)?)
    }
}

/// Per-stay attributes keyed by `stay_id`.
#[derive(Debug, Clone)]
pub struct StayFrame {
    label: String,
    data: DataFrame,
}

impl StayFrame {
    /// Wraps `data`, rejecting null or repeated stay ids.
    pub fn new(label: impl Into<String>, data: DataFrame) -> Result<Self> {
        let label = label.into();
        let data = cast_keys(&label, data, &[STAY_ID])?;
        let frame = Self { label, data };
        frame.index()?;
        Ok(frame)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    pub fn height(&self) -> usize {
        self.data.height()
    }

    pub fn feature_names(&self) -> Vec<String> {
        non_key_names(&self.data, &[STAY_ID])
    }

    /// Row of each stay.
    pub fn index(&self) -> Result<HashMap<StayId, usize>> {
        let stays = self.data.column(STAY_ID)?.i64()?;
        let mut index = HashMap::with_capacity(stays.len());
        for (row, stay) in stays.into_iter().enumerate() {
            let stay = stay.ok_or_else(|| TransformError::NullKey {
                frame: self.label.clone(),
                row,
            })?;
            if index.insert(stay, row).is_some() {
                return Err(TransformError::DuplicateStay {
                    frame: self.label.clone(),
                    stay_id: stay,
                });
            }
        }
        Ok(index)
    }
}

pub fn key_order(keys: &[(StayId, HourBucket)]) -> KeyOrder {
    let mut order = KeyOrder::SortedUnique;
    for pair in keys.windows(2) {
        if pair[0] > pair[1] {
            return KeyOrder::Unsorted;
        }
        if pair[0] == pair[1] {
            order = KeyOrder::Duplicates;
        }
    }
    order
}

/// Reorders `column` by `indices`; a `None` index yields null.
///
/// Float64, Int32, Int64 and String columns keep their type; anything else
/// is gathered as Float64.
pub fn gather_column(column: &Column, indices: &[Option<usize>]) -> Result<Column> {
    let name = column.name().as_str();
    let out = match column.dtype() {
        DataType::Int32 => {
            let source: Vec<Option<i32>> = column.i32()?.into_iter().collect();
            i32_column(name, pick(&source, indices))
        }
        DataType::Int64 => {
            let source: Vec<Option<i64>> = column.i64()?.into_iter().collect();
            i64_column(name, pick(&source, indices))
        }
        DataType::String => {
            let source: Vec<Option<&str>> = column.str()?.into_iter().collect();
            Series::new(name.into(), pick(&source, indices)).into()
        }
        _ => {
            let cast = column.cast(&DataType::Float64)?;
            let source: Vec<Option<f64>> = cast.f64()?.into_iter().collect();
            f64_column(name, pick(&source, indices))
        }
    };
    Ok(out)
}

fn pick<T: Copy>(source: &[Option<T>], indices: &[Option<usize>]) -> Vec<Option<T>> {
    indices
        .iter()
        .map(|index| index.and_then(|i| source.get(i).copied().flatten()))
        .collect()
}

fn cast_keys(label: &str, mut data: DataFrame, keys: &[&str]) -> Result<DataFrame> {
    for key in keys {
        let column = data.column(key).map_err(|_| TransformError::MissingKey {
            frame: label.to_string(),
            column: (*key).to_string(),
        })?;
        if column.dtype() != &DataType::Int64 {
            let cast = column.cast(&DataType::Int64)?;
            data.with_column(cast)?;
        }
    }
    Ok(data)
}

fn non_key_names(data: &DataFrame, keys: &[&str]) -> Vec<String> {
    data.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .filter(|name| !keys.contains(&name.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use icustate_model::MILLIS_PER_HOUR;

    fn frame(stays: &[i64], hours: &[i64], values: &[Option<f64>]) -> HourlyFrame {
        let data = DataFrame::new(vec![
            i64_column(STAY_ID, stays.iter().copied().map(Some).collect()),
            i64_column(
                HOUR_BIN,
                hours.iter().map(|h| Some(h * MILLIS_PER_HOUR)).collect(),
            ),
            f64_column("hr", values.to_vec()),
        ])
        .unwrap();
        HourlyFrame::new("test", data).unwrap()
    }

    #[test]
    fn sort_by_key_orders_stay_then_hour() {
        let sorted = frame(&[2, 1, 1], &[0, 5, 3], &[Some(1.0), Some(2.0), Some(3.0)])
            .sort_by_key()
            .unwrap();
        let keys: Vec<(i64, i64)> = sorted
            .keys()
            .unwrap()
            .into_iter()
            .map(|(s, h)| (s, h.as_millis() / MILLIS_PER_HOUR))
            .collect();
        assert_eq!(keys, vec![(1, 3), (1, 5), (2, 0)]);
        assert_eq!(
            sorted.f64_or_null("hr").unwrap(),
            vec![Some(3.0), Some(2.0), Some(1.0)]
        );
    }

    #[test]
    fn partitions_follow_stay_boundaries() {
        let f = frame(&[1, 1, 2, 3, 3], &[0, 1, 0, 0, 1], &[None; 5]);
        assert_eq!(f.partitions().unwrap(), vec![0..2, 2..3, 3..5]);
        assert!(HourlyFrame::empty("e", ["hr"]).unwrap().partitions().unwrap().is_empty());
    }

    #[test]
    fn empty_frame_rejects_clashing_feature_names() {
        let frame = HourlyFrame::empty("e", ["hr", "spo2"]).unwrap();
        assert_eq!(frame.feature_names(), vec!["hr".to_string(), "spo2".to_string()]);
        assert!(HourlyFrame::empty("e", ["hr", "hr"]).is_err());
        assert!(HourlyFrame::empty("e", [STAY_ID]).is_err());
    }

    #[test]
    fn key_order_detects_duplicates_and_disorder() {
        assert_eq!(
            frame(&[1, 1], &[0, 1], &[None; 2]).key_order().unwrap(),
            KeyOrder::SortedUnique
        );
        assert_eq!(
            frame(&[1, 1], &[1, 1], &[None; 2]).key_order().unwrap(),
            KeyOrder::Duplicates
        );
        assert_eq!(
            frame(&[2, 1], &[0, 0], &[None; 2]).key_order().unwrap(),
            KeyOrder::Unsorted
        );
    }

    #[test]
    fn absent_feature_reads_as_null() {
        let f = frame(&[1], &[0], &[Some(1.0)]);
        assert_eq!(f.f64_or_null("missing").unwrap(), vec![None]);
        assert_eq!(f.feature_names(), vec!["hr".to_string()]);
    }

    #[test]
    fn gather_keeps_dtype_and_inserts_nulls() {
        let column = i32_column("flag", vec![Some(1), Some(0)]);
        let gathered = gather_column(&column, &[Some(1), None, Some(0)]).unwrap();
        assert_eq!(gathered.dtype(), &DataType::Int32);
        let values: Vec<Option<i32>> = gathered.i32().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(0), None, Some(1)]);
    }

    #[test]
    fn stay_frame_rejects_repeated_stays() {
        let data = DataFrame::new(vec![i64_column(STAY_ID, vec![Some(1), Some(1)])]).unwrap();
        assert!(matches!(
            StayFrame::new("stay", data),
            Err(TransformError::DuplicateStay { stay_id: 1, .. })
        ));
    }
}
