#![deny(unsafe_code)]

use std::collections::BTreeSet;
use std::path::Path;

use icustate_model::{ColumnKind, OutputColumn, OutputSchema};

use super::for_each_row;
use crate::error::StandardsError;

/// Parses `state_features.csv` into the ordered output schema.
pub fn parse_state_features_csv(path: &Path) -> Result<OutputSchema, StandardsError> {
    let mut rows: Vec<(u32, OutputColumn)> = Vec::new();
    let mut names = BTreeSet::new();
    for_each_row(path, |row| {
        let line = row.line();
        let order_raw = row.require("Order", path)?;
        let order: u32 = order_raw.parse().map_err(|_| {
            StandardsError::csv(path, format!("line {line}: invalid Order {order_raw:?}"))
        })?;
        let name = row.require("Column", path)?.to_string();
        let kind: ColumnKind = row
            .require("Kind", path)?
            .parse()
            .map_err(|e| StandardsError::model(path, e))?;
        if !names.insert(name.clone()) {
            return Err(StandardsError::csv(
                path,
                format!("line {line}: duplicate Column {name}"),
            ));
        }
        rows.push((order, OutputColumn::new(name, kind)));
        Ok(())
    })?;
    rows.sort_by_key(|(order, _)| *order);
    Ok(OutputSchema::new(
        rows.into_iter().map(|(_, column)| column).collect(),
    ))
}
