//! Typed column accessors over Polars frames.
//!
//! Raw tables are read with every column as text; these helpers cast on
//! access so callers can read numeric or text columns the same way.

use polars::prelude::*;

/// Returns a column as text, casting non-string columns.
pub fn string_column(df: &DataFrame, name: &str) -> PolarsResult<StringChunked> {
    let column = df.column(name)?;
    if column.dtype() == &DataType::String {
        return Ok(column.str()?.clone());
    }
    let cast = column.cast(&DataType::String)?;
    Ok(cast.str()?.clone())
}

pub fn string_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let column = string_column(df, name)?;
    Ok(column
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

pub fn f64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

pub fn i64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<i64>>> {
    let column = df.column(name)?.cast(&DataType::Int64)?;
    Ok(column.i64()?.into_iter().collect())
}

pub fn i32_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<i32>>> {
    let column = df.column(name)?.cast(&DataType::Int32)?;
    Ok(column.i32()?.into_iter().collect())
}

pub fn f64_column(name: &str, values: Vec<Option<f64>>) -> Column {
    Series::new(name.into(), values).into()
}

pub fn i64_column(name: &str, values: Vec<Option<i64>>) -> Column {
    Series::new(name.into(), values).into()
}

pub fn i32_column(name: &str, values: Vec<Option<i32>>) -> Column {
    Series::new(name.into(), values).into()
}
