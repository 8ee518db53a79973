pub mod columns;
pub mod comorbidity;
pub mod error;
pub mod feature;
pub mod ids;
pub mod options;
pub mod report;
pub mod schema;
pub mod stay;

pub use comorbidity::{CodeSystem, ComorbidityCategory};
pub use error::{DataIntegrityError, ModelError, Result};
pub use feature::{
    AggregationRule, ConversionFactor, FeatureDefinition, FeatureMap, FeatureSource,
};
pub use ids::{AdmissionId, HourBucket, MILLIS_PER_HOUR, StayId, SubjectId};
pub use options::{PipelineOptions, WriteMode};
pub use report::{
    ExtractStats, FallbackReason, ImputationReport, ImputationWarning, StrategySelection,
    WriteReport, WriteStrategyKind,
};
pub use schema::{ColumnKind, OutputColumn, OutputSchema};
pub use stay::{Demographics, Stay};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_keeps_keys_first() {
        let schema = OutputSchema::new(vec![
            OutputColumn::new("age", ColumnKind::Float),
            OutputColumn::new(columns::STAY_ID, ColumnKind::Id),
            OutputColumn::new("sofa_score", ColumnKind::Int),
        ]);
        assert_eq!(schema.names(), vec!["stay_id", "hour_bin", "age", "sofa_score"]);
        assert_eq!(schema.features().count(), 2);
    }

    #[test]
    fn gender_flag_marks_female_only() {
        let mut demo = Demographics::default();
        assert_eq!(demo.gender_flag(), 0);
        demo.gender = Some(" f".to_string());
        assert_eq!(demo.gender_flag(), 1);
        demo.gender = Some("M".to_string());
        assert_eq!(demo.gender_flag(), 0);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: PipelineOptions =
            serde_json::from_str(r#"{"batch_rows": 10, "write_mode": "materialize"}"#)
                .expect("deserialize options");
        assert_eq!(options.batch_rows, 10);
        assert_eq!(options.write_mode, WriteMode::Materialize);
        assert_eq!(options.chunk_rows, options::DEFAULT_CHUNK_ROWS);
    }

    #[test]
    fn fallback_reason_serializes_with_tag() {
        let selection = StrategySelection::fallback(
            WriteStrategyKind::Materialized,
            FallbackReason::UnsortedKeys,
        );
        let json = serde_json::to_string(&selection).expect("serialize selection");
        assert_eq!(
            json,
            r#"{"chosen":"materialized","fallback_reason":{"reason":"unsorted_keys"}}"#
        );
    }
}
