#![deny(unsafe_code)]

use std::path::Path;

use icustate_model::{CodeSystem, ComorbidityCategory};

use super::for_each_row;
use crate::error::StandardsError;

/// Parses a `Category,Prefix` table for one code system.
pub fn parse_comorbidity_csv(
    path: &Path,
    system: CodeSystem,
) -> Result<Vec<ComorbidityCategory>, StandardsError> {
    let mut categories: Vec<ComorbidityCategory> = Vec::new();
    for_each_row(path, |row| {
        let name = row.require("Category", path)?;
        let prefix = row.require("Prefix", path)?.to_ascii_uppercase();
        match categories.iter_mut().find(|c| c.name == name) {
            Some(category) => {
                if !category.prefixes.contains(&prefix) {
                    category.prefixes.push(prefix);
                }
            }
            None => categories.push(ComorbidityCategory::new(name, system, vec![prefix])),
        }
        Ok(())
    })?;
    Ok(categories)
}
