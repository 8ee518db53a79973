#![deny(unsafe_code)]

use std::path::Path;

use icustate_model::ConversionFactor;

use super::for_each_row;
use crate::error::StandardsError;

pub fn parse_vasopressors_csv(path: &Path) -> Result<Vec<ConversionFactor>, StandardsError> {
    let mut factors: Vec<ConversionFactor> = Vec::new();
    for_each_row(path, |row| {
        let line = row.line();
        let feature = row.require("Feature", path)?;
        let raw = row.require("Factor", path)?;
        let factor = raw
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .ok_or_else(|| {
                StandardsError::csv(path, format!("line {line}: invalid Factor {raw:?}"))
            })?;
        if factors.iter().any(|f| f.feature == feature) {
            return Err(StandardsError::csv(
                path,
                format!("line {line}: duplicate Feature {feature}"),
            ));
        }
        factors.push(ConversionFactor::new(feature, factor));
        Ok(())
    })?;
    Ok(factors)
}
