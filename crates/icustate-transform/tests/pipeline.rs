//! End-to-end transform over small in-memory raw tables.

use chrono::NaiveDate;
use icustate_common::{f64_values, i32_values, i64_values};
use icustate_ingest::StayRegistry;
use icustate_model::columns::{
    ELIXHAUSER_SCORE, HEART_RATE, HOUR_BIN, MECHANICAL_VENTILATION, PF_RATIO, STAY_ID,
};
use icustate_model::{
    AggregationRule, CodeSystem, ColumnKind, ComorbidityCategory, ConversionFactor,
    FeatureDefinition, FeatureMap, FeatureSource, MILLIS_PER_HOUR, OutputColumn, OutputSchema,
    Stay,
};
use icustate_transform::{
    EventExtractor, KeyOrder, TransformConfig, derive_features, impute, merge_hourly,
    stay_attributes, with_stay_scores,
};
use polars::prelude::{Column, DataFrame, NamedFrom, Series};

const FMT: &str = "%Y-%m-%d %H:%M:%S";

fn registry() -> StayRegistry {
    let day = |d| {
        NaiveDate::from_ymd_opt(2150, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    };
    StayRegistry::from_stays([
        Stay {
            stay_id: 1,
            hadm_id: 10,
            subject_id: 100,
            intime: day(1),
            outtime: day(2),
            demographics: Default::default(),
        },
        Stay {
            stay_id: 2,
            hadm_id: 20,
            subject_id: 200,
            intime: day(1),
            outtime: day(2),
            demographics: Default::default(),
        },
    ])
}

fn text(name: &str, values: &[&str]) -> Column {
    Series::new(name.into(), values.to_vec()).into()
}

fn feature(source: FeatureSource, name: &str, rule: AggregationRule, item: i64) -> FeatureDefinition {
    FeatureDefinition::new(name, source, rule, [item]).unwrap()
}

fn config() -> TransformConfig {
    let chart = FeatureSource::ChartEvents;
    let labs = FeatureSource::LabEvents;
    let maps = vec![
        FeatureMap::new(
            chart,
            vec![
                feature(chart, "heart_rate", AggregationRule::Mean, 220045),
                feature(chart, "spo2", AggregationRule::Mean, 220277),
                feature(chart, "fio2", AggregationRule::Mean, 223835),
            ],
        )
        .unwrap(),
        FeatureMap::new(
            labs,
            vec![
                feature(labs, "glucose", AggregationRule::Mean, 50931),
                feature(labs, "pao2", AggregationRule::Mean, 50821),
            ],
        )
        .unwrap(),
    ];
    let categories = [ComorbidityCategory::new(
        "chf",
        CodeSystem::Icd10,
        vec!["I50".to_string()],
    )];
    let schema = OutputSchema::new(
        [
            ("stay_id", ColumnKind::Id),
            ("hour_bin", ColumnKind::Hour),
            ("elixhauser_score", ColumnKind::Int),
            ("heart_rate", ColumnKind::Float),
            ("glucose", ColumnKind::Float),
            ("pf_ratio", ColumnKind::Float),
            ("mechanical_ventilation", ColumnKind::Int),
            ("lactate", ColumnKind::Float),
        ]
        .into_iter()
        .map(|(name, kind)| OutputColumn::new(name, kind))
        .collect(),
    );
    TransformConfig::new(
        maps,
        &categories,
        vec![ConversionFactor::new("norepinephrine_dose", 1.0)],
        schema,
        0.0,
    )
}

fn chartevents() -> DataFrame {
    DataFrame::new(vec![
        text("stay_id", &["1", "1", "1", "1", "2"]),
        text("itemid", &["220277", "220045", "220045", "223835", "220045"]),
        text(
            "charttime",
            &[
                "2150-01-01 00:10:00",
                "2150-01-01 01:15:00",
                "2150-01-01 05:00:00",
                "2150-01-01 03:30:00",
                "2150-01-01 00:45:00",
            ],
        ),
        text("valuenum", &["97", "80", "100", "40", "120"]),
    ])
    .unwrap()
}

fn labevents() -> DataFrame {
    DataFrame::new(vec![
        text("subject_id", &["100", "100", "100"]),
        text("hadm_id", &["10", "10", "10"]),
        text("itemid", &["50931", "50931", "50821"]),
        text(
            "charttime",
            &["2150-01-01 03:05:00", "2150-01-01 03:50:00", "2150-01-01 03:20:00"],
        ),
        text("valuenum", &["100", "140", "80"]),
    ])
    .unwrap()
}

fn hour(millis: Option<i64>) -> i64 {
    millis.unwrap() / MILLIS_PER_HOUR % 24
}

#[test]
fn raw_events_become_an_imputed_scored_state_table() {
    let registry = registry();
    let config = config();

    let chart = config.feature_map(FeatureSource::ChartEvents).unwrap();
    let labs = config.feature_map(FeatureSource::LabEvents).unwrap();
    let vitals = EventExtractor::new(chart, &registry, FMT)
        .extract_frame(&chartevents(), 2)
        .unwrap();
    let lab = EventExtractor::new(labs, &registry, FMT)
        .extract_frame(&labevents(), 0)
        .unwrap();
    assert_eq!(lab.stats.groups, 1);

    let (attributes, _) = stay_attributes(&registry, None, None).unwrap();
    let (merged, report) =
        merge_hourly(&[vitals.frame, lab.frame], &[&attributes], &registry).unwrap();
    assert_eq!(report.dropped_unregistered, 0);

    let (imputed, _) = impute(merged, &config.imputation).unwrap();
    let derived = derive_features(imputed, &config.derivation).unwrap();
    let (scores, _) = config.classifier.score_stays(None, &registry).unwrap();
    let scored = with_stay_scores(derived, &scores).unwrap();
    assert_eq!(scored.key_order().unwrap(), KeyOrder::SortedUnique);

    let out = config.assembler.finalize(scored.data()).unwrap();
    insta::assert_snapshot!(
        out.get_column_names_str().join(","),
        @"stay_id,hour_bin,elixhauser_score,heart_rate,glucose,pf_ratio,mechanical_ventilation,lactate"
    );
    let stays = i64_values(&out, STAY_ID).unwrap();
    let hours: Vec<i64> = i64_values(&out, HOUR_BIN)
        .unwrap()
        .into_iter()
        .map(hour)
        .collect();
    // Stay 1 has hours 0, 1, 3 and 5; stay 2 only hour 0.
    assert_eq!(stays, vec![Some(1), Some(1), Some(1), Some(1), Some(2)]);
    assert_eq!(hours, vec![0, 1, 3, 5, 0]);

    let heart_rate = f64_values(&out, HEART_RATE).unwrap();
    // Hour 3 carries hour 1; hour 0 precedes the first reading and takes the
    // median of [80, 80, 100, 120].
    assert_eq!(heart_rate, vec![Some(90.0), Some(80.0), Some(80.0), Some(100.0), Some(120.0)]);

    let glucose = f64_values(&out, "glucose").unwrap();
    assert_eq!(glucose[2], Some(120.0));

    assert_eq!(f64_values(&out, PF_RATIO).unwrap()[2], Some(200.0));
    assert_eq!(i32_values(&out, MECHANICAL_VENTILATION).unwrap()[2], Some(1));
    assert_eq!(i32_values(&out, ELIXHAUSER_SCORE).unwrap(), vec![Some(0); 5]);
    assert_eq!(f64_values(&out, "lactate").unwrap(), vec![Some(0.0); 5]);
}

#[test]
fn identical_inputs_give_identical_tables() {
    let run = || {
        let registry = registry();
        let config = config();
        let chart = config.feature_map(FeatureSource::ChartEvents).unwrap();
        let vitals = EventExtractor::new(chart, &registry, FMT)
            .extract_frame(&chartevents(), 3)
            .unwrap();
        let (merged, _) = merge_hourly(&[vitals.frame], &[], &registry).unwrap();
        let (imputed, _) = impute(merged, &config.imputation).unwrap();
        derive_features(imputed, &config.derivation).unwrap().into_data()
    };
    assert!(run().equals_missing(&run()));
}

#[test]
fn quantity_columns_carry_forward_under_the_configured_policy() {
    let registry = registry();
    let output = FeatureSource::OutputEvents;
    let mut maps = config().feature_maps().to_vec();
    maps.push(
        FeatureMap::new(
            output,
            vec![feature(output, "urine_output", AggregationRule::Total, 226559)],
        )
        .unwrap(),
    );
    let no_categories: Vec<ComorbidityCategory> = Vec::new();
    let config = TransformConfig::new(maps, &no_categories, Vec::new(), OutputSchema::new(Vec::new()), 0.0);

    let chart = config.feature_map(FeatureSource::ChartEvents).unwrap();
    let urine = config.feature_map(output).unwrap();
    let vitals = EventExtractor::new(chart, &registry, FMT)
        .extract_frame(&chartevents(), 0)
        .unwrap();
    let outputevents = DataFrame::new(vec![
        text("stay_id", &["1"]),
        text("itemid", &["226559"]),
        text("charttime", &["2150-01-01 00:20:00"]),
        text("value", &["300"]),
    ])
    .unwrap();
    let quantities = EventExtractor::new(urine, &registry, FMT)
        .extract_frame(&outputevents, 0)
        .unwrap();

    let (merged, _) = merge_hourly(&[vitals.frame, quantities.frame], &[], &registry).unwrap();
    let (imputed, report) = impute(merged, &config.imputation).unwrap();
    // Stay 1 hours 0, 1, 3, 5 carry the hour-0 volume; stay 2 takes the median.
    assert_eq!(
        f64_values(imputed.data(), "urine_output").unwrap(),
        vec![Some(300.0); 5]
    );
    assert_eq!(report.forward_filled["urine_output"], 3);
    assert_eq!(report.median_filled["urine_output"], 1);
}
