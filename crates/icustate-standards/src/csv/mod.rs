#![deny(unsafe_code)]

pub mod comorbidity;
pub mod features;
pub mod schema;
pub mod vasopressors;

use std::path::Path;

use crate::error::StandardsError;

/// One record of a standards table with header-based access.
pub struct CsvRow<'a> {
    headers: &'a csv::StringRecord,
    record: csv::StringRecord,
    line: u64,
}

impl CsvRow<'_> {
    /// Trimmed, non-empty value of a column.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|h| h.trim_matches('\u{feff}') == name)
            .and_then(|i| self.record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn require(&self, name: &str, path: &Path) -> Result<&str, StandardsError> {
        self.get(name).ok_or_else(|| {
            StandardsError::csv(path, format!("line {}: missing {name}", self.line))
        })
    }

    pub fn line(&self) -> u64 {
        self.line
    }
}

/// Reads a headed CSV file and hands each row to `visit`.
pub(crate) fn for_each_row(
    path: &Path,
    mut visit: impl FnMut(CsvRow<'_>) -> Result<(), StandardsError>,
) -> Result<(), StandardsError> {
    let bytes = std::fs::read(path).map_err(|e| StandardsError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes.as_slice());
    let headers = reader
        .headers()
        .map_err(|e| StandardsError::csv(path, e.to_string()))?
        .clone();

    for record in reader.records() {
        let record = record.map_err(|e| StandardsError::csv(path, e.to_string()))?;
        let line = record.position().map_or(0, csv::Position::line);
        visit(CsvRow {
            headers: &headers,
            record,
            line,
        })?;
    }
    Ok(())
}
