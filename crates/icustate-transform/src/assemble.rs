//! Final assembly of the state table: per-stay scores are attached and the
//! fixed output schema is selected, typed and defaulted.

use icustate_common::{f64_column, i32_column};
use icustate_model::{ColumnKind, OutputSchema};
use polars::prelude::{Column, DataFrame, DataType, TimeUnit};
use tracing::{debug, warn};

use crate::error::Result;
use crate::frame::{HourlyFrame, StayFrame, gather_column};

/// Left-joins per-stay score columns, filling stays without a row with 0.
pub fn with_stay_scores(frame: HourlyFrame, scores: &StayFrame) -> Result<HourlyFrame> {
    let index = scores.index()?;
    let indices: Vec<Option<usize>> = frame
        .keys()?
        .iter()
        .map(|(stay, _)| index.get(stay).copied())
        .collect();
    let mut data = frame.data().clone();
    for name in scores.feature_names() {
        let gathered = gather_column(scores.data().column(&name)?, &indices)?;
        let filled = match gathered.dtype() {
            DataType::Int32 => {
                let values = gathered.i32()?.into_iter().map(|v| Some(v.unwrap_or(0))).collect();
                i32_column(&name, values)
            }
            _ => {
                let cast = gathered.cast(&DataType::Float64)?;
                let values = cast.f64()?.into_iter().map(|v| Some(v.unwrap_or(0.0))).collect();
                f64_column(&name, values)
            }
        };
        data.with_column(filled)?;
    }
    frame.with_data(data)
}

/// Selects the output columns in schema order.
#[derive(Debug, Clone)]
pub struct StateAssembler {
    schema: OutputSchema,
    default: f64,
}

impl StateAssembler {
    /// `default` fills feature columns the run never produced.
    pub fn new(schema: OutputSchema, default: f64) -> Self {
        Self { schema, default }
    }

    pub fn schema(&self) -> &OutputSchema {
        &self.schema
    }

    /// Feature columns of the schema that `frame` lacks.
    pub fn absent_columns(&self, frame: &DataFrame) -> Vec<String> {
        self.schema
            .features()
            .filter(|column| frame.column(&column.name).is_err())
            .map(|column| column.name.clone())
            .collect()
    }

    /// Projects `frame` (or any row slice of it) onto the output schema.
    ///
    /// Keys are Int64 `stay_id` and a millisecond Datetime `hour_bin`;
    /// features are Float64 or Int32 by kind.
    pub fn finalize(&self, frame: &DataFrame) -> Result<DataFrame> {
        let rows = frame.height();
        let mut columns: Vec<Column> = Vec::with_capacity(self.schema.len());
        for column in self.schema.columns() {
            let name = column.name.as_str();
            let out = match (column.kind, frame.column(name)) {
                (ColumnKind::Id, Ok(source)) => source.cast(&DataType::Int64)?,
                (ColumnKind::Hour, Ok(source)) => source
                    .cast(&DataType::Int64)?
                    .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?,
                (ColumnKind::Float, Ok(source)) => source.cast(&DataType::Float64)?,
                (ColumnKind::Int, Ok(source)) => {
                    let rounded = source.cast(&DataType::Float64)?;
                    let values = rounded
                        .f64()?
                        .into_iter()
                        .map(|v| v.map(|v| v.round() as i32))
                        .collect();
                    i32_column(name, values)
                }
                (ColumnKind::Float, Err(_)) => f64_column(name, vec![Some(self.default); rows]),
                (ColumnKind::Int, Err(_)) => {
                    i32_column(name, vec![Some(self.default.round() as i32); rows])
                }
                (ColumnKind::Id | ColumnKind::Hour, Err(err)) => return Err(err.into()),
            };
            columns.push(out);
        }
        debug!(rows, columns = columns.len(), "batch finalized");
        Ok(DataFrame::new(columns)?)
    }

    /// Logs the schema columns the run never produced.
    pub fn report_absent(&self, frame: &DataFrame) -> Vec<String> {
        let absent = self.absent_columns(frame);
        if !absent.is_empty() {
            warn!(columns = ?absent, default = self.default, "output columns filled with default");
        }
        absent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icustate_common::{i64_column, i32_values};
    use icustate_model::columns::{ELIXHAUSER_SCORE, HOUR_BIN, STAY_ID};
    use icustate_model::{MILLIS_PER_HOUR, OutputColumn};

    fn hourly() -> HourlyFrame {
        let data = DataFrame::new(vec![
            i64_column(STAY_ID, vec![Some(1), Some(1), Some(2)]),
            i64_column(HOUR_BIN, vec![Some(0), Some(MILLIS_PER_HOUR), Some(0)]),
            f64_column("heart_rate", vec![Some(80.0), Some(82.0), Some(90.0)]),
            f64_column("sofa_score", vec![Some(2.0), Some(3.0), Some(1.0)]),
        ])
        .unwrap();
        HourlyFrame::new("derived", data).unwrap()
    }

    #[test]
    fn stays_without_scores_get_zero() {
        let scores = StayFrame::new(
            "comorbidity",
            DataFrame::new(vec![
                i64_column(STAY_ID, vec![Some(1)]),
                i32_column(ELIXHAUSER_SCORE, vec![Some(3)]),
            ])
            .unwrap(),
        )
        .unwrap();
        let joined = with_stay_scores(hourly(), &scores).unwrap();
        assert_eq!(
            i32_values(joined.data(), ELIXHAUSER_SCORE).unwrap(),
            vec![Some(3), Some(3), Some(0)]
        );
    }

    #[test]
    fn finalize_orders_types_and_defaults_columns() {
        let schema = OutputSchema::new(vec![
            OutputColumn::new(STAY_ID, ColumnKind::Id),
            OutputColumn::new(HOUR_BIN, ColumnKind::Hour),
            OutputColumn::new("sofa_score", ColumnKind::Int),
            OutputColumn::new("albumin", ColumnKind::Float),
            OutputColumn::new("heart_rate", ColumnKind::Float),
        ]);
        let assembler = StateAssembler::new(schema, 0.0);
        let frame = hourly().into_data();
        assert_eq!(assembler.absent_columns(&frame), vec!["albumin".to_string()]);
        let out = assembler.finalize(&frame).unwrap();
        assert_eq!(
            out.get_column_names(),
            vec!["stay_id", "hour_bin", "sofa_score", "albumin", "heart_rate"]
        );
        assert_eq!(
            out.column(HOUR_BIN).unwrap().dtype(),
            &DataType::Datetime(TimeUnit::Milliseconds, None)
        );
        assert_eq!(out.column("sofa_score").unwrap().dtype(), &DataType::Int32);
        assert_eq!(out.column("albumin").unwrap().null_count(), 0);
    }
}
