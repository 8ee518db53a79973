//! Feature definitions driving the conditional aggregation engine.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Event table a feature is extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureSource {
    ChartEvents,
    LabEvents,
    OutputEvents,
    InputEvents,
    /// Per-stay body weight, read from the chart events table.
    Weight,
}

impl FeatureSource {
    pub const ALL: [FeatureSource; 5] = [
        FeatureSource::ChartEvents,
        FeatureSource::LabEvents,
        FeatureSource::OutputEvents,
        FeatureSource::InputEvents,
        FeatureSource::Weight,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FeatureSource::ChartEvents => "chartevents",
            FeatureSource::LabEvents => "labevents",
            FeatureSource::OutputEvents => "outputevents",
            FeatureSource::InputEvents => "inputevents",
            FeatureSource::Weight => "weight",
        }
    }

    /// File stem of the raw table backing this source.
    pub fn table(self) -> &'static str {
        match self {
            FeatureSource::Weight => "chartevents",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for FeatureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureSource {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        FeatureSource::ALL
            .into_iter()
            .find(|source| source.as_str() == normalized)
            .ok_or_else(|| ModelError::UnknownSource(value.to_string()))
    }
}

/// Reducer applied to the masked values of one feature within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationRule {
    /// Arithmetic mean of matching values; null when nothing matched.
    Mean,
    /// Sum of matching values; null when nothing matched.
    Sum,
    /// Value with the earliest timestamp; null when nothing matched.
    First,
    /// Cumulative quantity: sum of matching values, zero when nothing matched.
    Total,
}

impl AggregationRule {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregationRule::Mean => "mean",
            AggregationRule::Sum => "sum",
            AggregationRule::First => "first",
            AggregationRule::Total => "total",
        }
    }
}

impl fmt::Display for AggregationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationRule {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(AggregationRule::Mean),
            "sum" => Ok(AggregationRule::Sum),
            "first" => Ok(AggregationRule::First),
            "total" => Ok(AggregationRule::Total),
            _ => Err(ModelError::UnknownRule(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureDefinition {
    pub name: String,
    pub source: FeatureSource,
    pub rule: AggregationRule,
    pub item_ids: BTreeSet<i64>,
    pub label: Option<String>,
}

impl FeatureDefinition {
    pub fn new(
        name: impl Into<String>,
        source: FeatureSource,
        rule: AggregationRule,
        item_ids: impl IntoIterator<Item = i64>,
    ) -> Result<Self> {
        let name = name.into();
        let trimmed = name.trim();
        let valid = !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid {
            return Err(ModelError::InvalidFeatureName(name));
        }
        Ok(Self {
            name: trimmed.to_string(),
            source,
            rule,
            item_ids: item_ids.into_iter().collect(),
            label: None,
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Weight of one agent's dose in the vasopressor equivalent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionFactor {
    pub feature: String,
    pub factor: f64,
}

impl ConversionFactor {
    pub fn new(feature: impl Into<String>, factor: f64) -> Self {
        Self {
            feature: feature.into(),
            factor,
        }
    }
}

/// Immutable `{feature -> item-id set}` map for one source.
///
/// An item id may feed several features; lookups return every feature index
/// whose id set contains the item.
#[derive(Debug, Clone)]
pub struct FeatureMap {
    source: FeatureSource,
    features: Vec<FeatureDefinition>,
    by_item: HashMap<i64, Vec<usize>>,
}

impl FeatureMap {
    pub fn new(source: FeatureSource, features: Vec<FeatureDefinition>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        let mut by_item: HashMap<i64, Vec<usize>> = HashMap::new();
        for (index, feature) in features.iter().enumerate() {
            if feature.source != source {
                return Err(ModelError::SourceMismatch {
                    name: feature.name.clone(),
                    expected: source.to_string(),
                    found: feature.source.to_string(),
                });
            }
            if !seen.insert(feature.name.as_str()) {
                return Err(ModelError::DuplicateFeature {
                    name: feature.name.clone(),
                    table: source.to_string(),
                });
            }
            for item in &feature.item_ids {
                by_item.entry(*item).or_default().push(index);
            }
        }
        Ok(Self {
            source,
            features,
            by_item,
        })
    }

    pub fn source(&self) -> FeatureSource {
        self.source
    }

    pub fn features(&self) -> &[FeatureDefinition] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features_for(&self, item_id: i64) -> &[usize] {
        self.by_item.get(&item_id).map_or(&[], Vec::as_slice)
    }

    pub fn contains_item(&self, item_id: i64) -> bool {
        self.by_item.contains_key(&item_id)
    }

    /// Every item id any feature reads, in no particular order.
    pub fn item_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.by_item.keys().copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&FeatureDefinition> {
        self.features.iter().find(|f| f.name == name)
    }
}
