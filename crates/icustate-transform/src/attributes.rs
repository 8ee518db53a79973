//! Time-independent per-stay attributes: demographics, body weight and the
//! readmission flag.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;
use icustate_common::{f64_column, i32_column, i64_column, parse_date, parse_f64, parse_i64, string_column};
use icustate_ingest::StayRegistry;
use icustate_model::columns::{ADMISSION_TYPE, AGE, GENDER, ICU_READMISSION, STAY_ID, SUBJECT_ID, WEIGHT_KG};
use icustate_model::{StayId, SubjectId};
use polars::prelude::{DataFrame, NamedFrom, Series};
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::frame::StayFrame;
use crate::readmission::readmission_flags;

pub const LBS_TO_KG: f64 = 0.453592;
/// Plausible body weights in kg, both bounds exclusive.
pub const WEIGHT_RANGE_KG: (f64, f64) = (10.0, 300.0);

/// Where each stay's weight came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttributeReport {
    pub stays: usize,
    pub charted_weights: usize,
    pub outpatient_weights: usize,
    pub missing_weights: usize,
    pub readmissions: usize,
}

/// Builds the per-stay attribute table for every registered stay.
///
/// `charted` is the per-stay `weight_kg` frame extracted from the vitals
/// table. Stays without a charted weight fall back to the earliest
/// outpatient weight of their subject.
pub fn stay_attributes(
    registry: &StayRegistry,
    charted: Option<&StayFrame>,
    omr: Option<&DataFrame>,
) -> Result<(StayFrame, AttributeReport)> {
    let charted = match charted {
        Some(frame) => charted_weights(frame)?,
        None => HashMap::new(),
    };
    let outpatient = match omr {
        Some(df) => outpatient_weights(df)?,
        None => HashMap::new(),
    };
    let readmissions = readmission_flags(registry);

    let mut report = AttributeReport {
        stays: registry.len(),
        ..AttributeReport::default()
    };
    let capacity = registry.len();
    let mut stay_ids = Vec::with_capacity(capacity);
    let mut ages = Vec::with_capacity(capacity);
    let mut genders = Vec::with_capacity(capacity);
    let mut kinds: Vec<Option<String>> = Vec::with_capacity(capacity);
    let mut weights = Vec::with_capacity(capacity);
    let mut flags = Vec::with_capacity(capacity);

    for stay in registry.iter() {
        let weight = match charted.get(&stay.stay_id) {
            Some(kg) => {
                report.charted_weights += 1;
                Some(*kg)
            }
            None => match outpatient.get(&stay.subject_id) {
                Some(kg) => {
                    report.outpatient_weights += 1;
                    Some(*kg)
                }
                None => {
                    report.missing_weights += 1;
                    None
                }
            },
        };
        let flag = readmissions.get(&stay.stay_id).copied().unwrap_or(0);
        report.readmissions += usize::from(flag == 1);

        stay_ids.push(Some(stay.stay_id));
        ages.push(stay.demographics.age);
        genders.push(Some(stay.demographics.gender_flag()));
        kinds.push(stay.demographics.admission_type.clone());
        weights.push(weight);
        flags.push(Some(flag));
    }

    let data = DataFrame::new(vec![
        i64_column(STAY_ID, stay_ids),
        f64_column(AGE, ages),
        i32_column(GENDER, genders),
        Series::new(ADMISSION_TYPE.into(), kinds).into(),
        f64_column(WEIGHT_KG, weights),
        i32_column(ICU_READMISSION, flags),
    ])?;
    info!(
        stays = report.stays,
        charted_weights = report.charted_weights,
        outpatient_weights = report.outpatient_weights,
        missing_weights = report.missing_weights,
        readmissions = report.readmissions,
        "stay attributes built"
    );
    Ok((StayFrame::new("attributes", data)?, report))
}

fn charted_weights(frame: &StayFrame) -> Result<HashMap<StayId, f64>> {
    let stays = frame.data().column(STAY_ID)?.i64()?;
    let weights = icustate_common::f64_values(frame.data(), WEIGHT_KG)?;
    Ok(stays
        .into_iter()
        .zip(weights)
        .filter_map(|(stay, kg)| Some((stay?, kg?)))
        .collect())
}

/// Earliest pound-denominated weight of each subject, converted to kg.
///
/// Reads `subject_id, chartdate, result_name, result_value`; rows whose
/// name is not a weight in pounds, or that do not parse, are skipped.
pub fn outpatient_weights(omr: &DataFrame) -> Result<HashMap<SubjectId, f64>> {
    let subjects = string_column(omr, SUBJECT_ID)?;
    let dates = string_column(omr, "chartdate")?;
    let names = string_column(omr, "result_name")?;
    let values = string_column(omr, "result_value")?;

    let mut earliest: BTreeMap<SubjectId, (NaiveDateTime, f64)> = BTreeMap::new();
    let rows = subjects
        .into_iter()
        .zip(dates.into_iter())
        .zip(names.into_iter())
        .zip(values.into_iter());
    for (((subject, date), name), value) in rows {
        let Some(name) = name else { continue };
        if !(name.contains("Weight") && name.contains("Lbs")) {
            continue;
        }
        let parsed = (
            subject.and_then(parse_i64),
            date.and_then(parse_date),
            value.and_then(parse_f64),
        );
        let (Some(subject), Some(date), Some(lbs)) = parsed else {
            continue;
        };
        let kg = lbs * LBS_TO_KG;
        if !(kg > WEIGHT_RANGE_KG.0 && kg < WEIGHT_RANGE_KG.1) {
            continue;
        }
        earliest
            .entry(subject)
            .and_modify(|slot| {
                if date < slot.0 {
                    *slot = (date, kg);
                }
            })
            .or_insert((date, kg));
    }
    Ok(earliest.into_iter().map(|(s, (_, kg))| (s, kg)).collect())
}
