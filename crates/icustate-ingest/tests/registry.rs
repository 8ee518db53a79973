use chrono::NaiveDateTime;
use icustate_ingest::{AdmissionResolution, StayRegistry};
use icustate_model::options::DEFAULT_TIMESTAMP_FORMAT;
use polars::prelude::*;

fn ts(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, DEFAULT_TIMESTAMP_FORMAT).unwrap()
}

fn text(name: &str, values: &[Option<&str>]) -> Column {
    Series::new(name.into(), values.to_vec()).into()
}

fn stays_frame() -> DataFrame {
    DataFrame::new(vec![
        text("subject_id", &[Some("1"), Some("1"), Some("2"), Some("3"), Some("4"), Some("1")]),
        text("hadm_id", &[Some("100"), Some("100"), Some("200"), Some("300"), None, Some("100")]),
        text("stay_id", &[Some("10"), Some("11"), Some("20"), Some("30"), Some("40"), Some("10")]),
        text(
            "intime",
            &[
                Some("2150-01-01 08:00:00"),
                Some("2150-01-03 09:30:00"),
                Some("2150-02-01 00:00:00"),
                Some("2150-02-01T00:00:00"),
                Some("2150-03-01 00:00:00"),
                Some("2150-01-01 08:00:00"),
            ],
        ),
        text(
            "outtime",
            &[
                Some("2150-01-02 08:00:00"),
                Some("2150-01-04 09:30:00"),
                Some("2150-02-02 00:00:00"),
                Some("2150-02-02 00:00:00"),
                Some("2150-03-02 00:00:00"),
                Some("2150-01-02 08:00:00"),
            ],
        ),
    ])
    .unwrap()
}

fn registry() -> StayRegistry {
    StayRegistry::from_frame(&stays_frame(), DEFAULT_TIMESTAMP_FORMAT)
        .unwrap()
        .0
}

#[test]
fn malformed_rows_are_dropped_and_counted() {
    let (registry, report) =
        StayRegistry::from_frame(&stays_frame(), DEFAULT_TIMESTAMP_FORMAT).unwrap();

    assert_eq!(report.rows_read, 6);
    assert_eq!(report.dropped_count(), 3);
    let columns: Vec<&str> = report.dropped.iter().map(|e| e.column.as_str()).collect();
    assert_eq!(columns, vec!["intime", "hadm_id", "stay_id"]);

    assert_eq!(registry.len(), 3);
    assert!(registry.contains(10));
    assert!(!registry.contains(30));
    let stay = registry.get(11).unwrap();
    assert_eq!(stay.hadm_id, 100);
    assert_eq!(stay.intime, ts("2150-01-03 09:30:00"));
}

#[test]
fn admission_stays_are_ordered_by_intime() {
    let registry = registry();
    assert_eq!(registry.stays_for_admission(100), &[10, 11]);
    assert!(registry.stays_for_admission(999).is_empty());
}

#[test]
fn admission_events_resolve_within_the_stay_window() {
    let registry = registry();
    assert_eq!(
        registry.resolve_admission(100, Some(1), ts("2150-01-01 08:00:00")),
        AdmissionResolution::Stay(10)
    );
    assert_eq!(
        registry.resolve_admission(100, None, ts("2150-01-03 12:00:00")),
        AdmissionResolution::Stay(11)
    );
    assert_eq!(
        registry.resolve_admission(100, Some(1), ts("2150-01-02 20:00:00")),
        AdmissionResolution::OutOfWindow
    );
    assert_eq!(
        registry.resolve_admission(100, Some(2), ts("2150-01-01 09:00:00")),
        AdmissionResolution::Unknown
    );
    assert_eq!(
        registry.resolve_admission(555, None, ts("2150-01-01 09:00:00")),
        AdmissionResolution::Unknown
    );
}

#[test]
fn demographics_attach_by_subject_and_admission() {
    let patients = DataFrame::new(vec![
        text("subject_id", &[Some("1"), Some("2")]),
        text("gender", &[Some("F"), Some("M")]),
        text("anchor_age", &[Some("71"), Some("n/a")]),
    ])
    .unwrap();
    let admissions = DataFrame::new(vec![
        text("hadm_id", &[Some("100")]),
        text("admission_type", &[Some("EW EMER.")]),
    ])
    .unwrap();

    let base = registry();
    let enriched = base
        .with_demographics(Some(&patients), Some(&admissions))
        .unwrap();

    let first = &enriched.get(10).unwrap().demographics;
    assert_eq!(first.gender.as_deref(), Some("F"));
    assert_eq!(first.age, Some(71.0));
    assert_eq!(first.admission_type.as_deref(), Some("EW EMER."));
    assert_eq!(first.gender_flag(), 1);

    let second = &enriched.get(20).unwrap().demographics;
    assert_eq!(second.age, None);
    assert_eq!(second.admission_type, None);

    assert_eq!(base.get(10).unwrap().demographics.gender, None);
    assert_eq!(enriched.stays_for_admission(100), &[10, 11]);
}

#[test]
fn missing_demographic_tables_leave_attributes_unknown() {
    let enriched = registry().with_demographics(None, None).unwrap();
    assert!(enriched.iter().all(|s| s.demographics.age.is_none()));
    assert_eq!(enriched.len(), 3);
}
