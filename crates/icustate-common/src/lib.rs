//! Shared utilities for icustate crates.
//!
//! Value parsing used by every raw-table reader and typed column accessors
//! over Polars frames.

pub mod parse;
pub mod polars;

pub use parse::{parse_date, parse_f64, parse_i64, parse_timestamp};
pub use polars::{
    f64_column, f64_values, i32_column, i32_values, i64_column, i64_values, string_column,
    string_values,
};
