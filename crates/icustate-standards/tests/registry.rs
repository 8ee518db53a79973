use std::fs;
use std::path::{Path, PathBuf};

use icustate_model::{AggregationRule, CodeSystem, FeatureSource};
use icustate_standards::hash::sha256_hex;
use icustate_standards::{StandardsError, StandardsRegistry};

fn workspace_standards() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../standards")
}

fn write(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

const FEATURES: &[u8] = b"Source,Feature,Item ID,Rule,Label
chartevents,heart_rate,220045,mean,Heart Rate
labevents,wbc,51301,mean,White Blood Cells
labevents,wbc,51300,mean,White Blood Cells
inputevents,crystalloid_ml,225158,total,Crystalloid Volume
";
const VASOPRESSORS: &[u8] = b"Feature,Factor\nnorepinephrine_dose,1.0\n";
const ICD9: &[u8] = b"Category,Prefix\nchf,428\nchf,4254\n";
const ICD10: &[u8] = b"Category,Prefix\nchf,i50\nhtn_uncomp,I10\n";
const STATE: &[u8] = b"Order,Column,Kind
2,hour_bin,hour
1,stay_id,id
4,sofa_score,int
3,heart_rate,float
";

fn minimal_standards(dir: &Path) {
    let files: [(&str, &str, &[u8]); 5] = [
        ("features/features.csv", "features", FEATURES),
        ("features/vasopressors.csv", "vasopressors", VASOPRESSORS),
        ("comorbidity/icd9.csv", "elixhauser_icd9", ICD9),
        ("comorbidity/icd10.csv", "elixhauser_icd10", ICD10),
        ("output/state.csv", "state_features", STATE),
    ];
    let mut manifest = String::from(
        "[manifest]\nschema = \"icustate.standards-manifest\"\nschema_version = 1\n\n\
         [pins]\nsource = \"test\"\ncomorbidity = \"test\"\n",
    );
    for (path, role, contents) in files {
        write(&dir.join(path), contents);
        manifest.push_str(&format!(
            "\n[[files]]\npath = \"{path}\"\nsha256 = \"{}\"\nkind = \"csv\"\nrole = \"{role}\"\n",
            sha256_hex(contents)
        ));
    }
    write(&dir.join("manifest.toml"), manifest.as_bytes());
}

#[test]
fn workspace_standards_verify_and_load() {
    let (registry, summary) =
        StandardsRegistry::verify_and_load(&workspace_standards()).expect("load standards");

    assert_eq!(summary.file_count, 5);
    assert_eq!(summary.feature_count, 46);
    assert_eq!(summary.item_count, 72);
    assert_eq!(summary.icd9_categories, 31);
    assert_eq!(summary.icd10_categories, 31);
    assert_eq!(summary.vasopressor_count, 6);
    assert_eq!(summary.output_columns, 50);

    let chart = registry.feature_map(FeatureSource::ChartEvents).unwrap();
    assert_eq!(chart.len(), 11);
    let sbp = chart.get("sbp").unwrap();
    assert!(sbp.item_ids.contains(&220179));
    assert!(sbp.item_ids.contains(&220050));

    let weight = registry.feature_map(FeatureSource::Weight).unwrap();
    assert_eq!(weight.features()[0].rule, AggregationRule::First);

    let pulmonary = registry
        .elixhauser_icd9
        .iter()
        .find(|c| c.name == "pulmonary_circ")
        .unwrap();
    assert!(pulmonary.matches("41519"));
}

#[test]
fn output_schema_order_is_stable() {
    let (registry, _) = StandardsRegistry::verify_and_load(&workspace_standards()).unwrap();
    let names = registry.output_schema.names();
    assert_eq!(&names[..4], &["stay_id", "hour_bin", "age", "gender"]);
    insta::assert_snapshot!(names[names.len() - 6..].join(","), @"hco3,pf_ratio,mechanical_ventilation,fio2,urine_output,cumulative_fluid_balance");
}

#[test]
fn minimal_standards_merge_rows_per_feature() {
    let dir = tempfile::tempdir().unwrap();
    minimal_standards(dir.path());

    let (registry, summary) = StandardsRegistry::verify_and_load(dir.path()).unwrap();
    assert_eq!(summary.feature_count, 3);
    assert_eq!(summary.item_count, 4);

    let labs = registry.feature_map(FeatureSource::LabEvents).unwrap();
    assert_eq!(labs.features_for(51300), &[0]);
    assert_eq!(labs.features_for(51301), &[0]);

    assert_eq!(
        registry.output_schema.names(),
        vec!["stay_id", "hour_bin", "heart_rate", "sofa_score"]
    );
    let chf = &registry.elixhauser_icd10[0];
    assert_eq!(chf.system, CodeSystem::Icd10);
    assert_eq!(chf.prefixes, vec!["I50".to_string()]);
    assert_eq!(registry.comorbidity_categories().count(), 3);
}

#[test]
fn tampered_file_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    minimal_standards(dir.path());
    write(
        &dir.path().join("features/vasopressors.csv"),
        b"Feature,Factor\nnorepinephrine_dose,2.0\n",
    );

    let err = StandardsRegistry::verify_and_load(dir.path()).unwrap_err();
    assert!(matches!(err, StandardsError::Sha256Mismatch { .. }), "{err}");
}

#[test]
fn unlisted_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    minimal_standards(dir.path());
    write(&dir.path().join("features/extra.csv"), b"x\n");

    let err = StandardsRegistry::verify_and_load(dir.path()).unwrap_err();
    assert!(matches!(err, StandardsError::UnexpectedFile { .. }), "{err}");
}

#[test]
fn conflicting_rules_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let features = b"Source,Feature,Item ID,Rule\nlabevents,wbc,1,mean\nlabevents,wbc,2,sum\n";
    let path = dir.path().join("features.csv");
    write(&path, features);

    let err = icustate_standards::csv::features::parse_features_csv(&path).unwrap_err();
    assert!(err.to_string().contains("uses rule sum"), "{err}");
}
