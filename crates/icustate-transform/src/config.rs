use icustate_model::{ComorbidityCategory, ConversionFactor, FeatureMap, FeatureSource, OutputSchema};

use crate::assemble::StateAssembler;
use crate::comorbidity::ComorbidityClassifier;
use crate::derive::DerivationConfig;
use crate::impute::ImputationPolicy;

/// Static tables every transform stage reads, built once per run.
#[derive(Debug, Clone)]
pub struct TransformConfig {
    feature_maps: Vec<FeatureMap>,
    pub classifier: ComorbidityClassifier,
    pub derivation: DerivationConfig,
    pub imputation: ImputationPolicy,
    pub assembler: StateAssembler,
}

impl TransformConfig {
    pub fn new<'a>(
        feature_maps: Vec<FeatureMap>,
        categories: impl IntoIterator<Item = &'a ComorbidityCategory>,
        vasopressors: Vec<ConversionFactor>,
        schema: OutputSchema,
        impute_default: f64,
    ) -> Self {
        Self {
            classifier: ComorbidityClassifier::new(categories),
            derivation: DerivationConfig::new(vasopressors),
            imputation: ImputationPolicy::new(impute_default),
            assembler: StateAssembler::new(schema, impute_default),
            feature_maps,
        }
    }

    /// The feature map of `source`, if any feature reads from it.
    pub fn feature_map(&self, source: FeatureSource) -> Option<&FeatureMap> {
        self.feature_maps
            .iter()
            .find(|map| map.source() == source && !map.is_empty())
    }

    pub fn feature_maps(&self) -> &[FeatureMap] {
        &self.feature_maps
    }
}
