#![deny(unsafe_code)]

use std::collections::BTreeMap;
use std::path::Path;

use icustate_model::{AggregationRule, FeatureDefinition, FeatureSource};

use super::for_each_row;
use crate::error::StandardsError;

/// Parses `features.csv`: one row per (source, feature, item id).
///
/// Rows sharing a source and feature are merged into one definition; features
/// keep the order of their first row.
pub fn parse_features_csv(path: &Path) -> Result<Vec<FeatureDefinition>, StandardsError> {
    let mut order: Vec<(FeatureSource, String)> = Vec::new();
    let mut merged: BTreeMap<(FeatureSource, String), FeatureDefinition> = BTreeMap::new();

    for_each_row(path, |row| {
        let line = row.line();
        let source: FeatureSource = row
            .require("Source", path)?
            .parse()
            .map_err(|e| StandardsError::model(path, e))?;
        let name = row.require("Feature", path)?.to_string();
        let rule: AggregationRule = row
            .require("Rule", path)?
            .parse()
            .map_err(|e| StandardsError::model(path, e))?;
        let item_raw = row.require("Item ID", path)?;
        let item: i64 = item_raw.parse().map_err(|_| {
            StandardsError::csv(path, format!("line {line}: invalid Item ID {item_raw:?}"))
        })?;
        let label = row.get("Label").map(str::to_string);

        let key = (source, name.clone());
        match merged.get_mut(&key) {
            Some(existing) => {
                if existing.rule != rule {
                    return Err(StandardsError::csv(
                        path,
                        format!(
                            "line {line}: feature {name} uses rule {rule}, earlier rows use {}",
                            existing.rule
                        ),
                    ));
                }
                existing.item_ids.insert(item);
            }
            None => {
                let mut definition = FeatureDefinition::new(name, source, rule, [item])
                    .map_err(|e| StandardsError::model(path, e))?;
                if let Some(label) = label {
                    definition = definition.with_label(label);
                }
                order.push(key.clone());
                merged.insert(key, definition);
            }
        }
        Ok(())
    })?;

    Ok(order
        .into_iter()
        .filter_map(|key| merged.remove(&key))
        .collect())
}
