//! Parsing of raw CSV cell values.

use chrono::{NaiveDate, NaiveDateTime};

/// Parses a finite `f64`, returning `None` for empty, invalid or non-finite input.
///
/// # Examples
///
/// ```
/// use icustate_common::parse_f64;
///
/// assert_eq!(parse_f64(" 98.6 "), Some(98.6));
/// assert_eq!(parse_f64("NaN"), None);
/// assert_eq!(parse_f64(""), None);
/// ```
pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses an identifier. Integral floats such as `"30000153.0"` are accepted.
///
/// # Examples
///
/// ```
/// use icustate_common::parse_i64;
///
/// assert_eq!(parse_i64("30000153"), Some(30000153));
/// assert_eq!(parse_i64("30000153.0"), Some(30000153));
/// assert_eq!(parse_i64("1.5"), None);
/// ```
pub fn parse_i64(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(v);
    }
    let float = trimmed.parse::<f64>().ok()?;
    if float.is_finite() && float.fract() == 0.0 && float.abs() < 9.0e15 {
        Some(float as i64)
    } else {
        None
    }
}

/// Parses a timestamp with the given chrono format.
pub fn parse_timestamp(value: &str, format: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(trimmed, format).ok()
}

/// Parses an ISO date (`%Y-%m-%d`), returning midnight of that day.
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
