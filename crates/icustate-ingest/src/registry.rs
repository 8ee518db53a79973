//! The stay registry: immutable lookup from stay id to its admission,
//! subject, time window and demographics.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;
use icustate_common::{parse_f64, parse_i64, parse_timestamp, string_column};
use icustate_model::columns::{HADM_ID, STAY_ID, SUBJECT_ID};
use icustate_model::{AdmissionId, DataIntegrityError, Demographics, Stay, StayId, SubjectId};
use polars::prelude::DataFrame;
use serde::Serialize;

use crate::error::Result;

/// Rows read from the stay index and the rows that were dropped.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistryReport {
    pub rows_read: usize,
    pub dropped: Vec<DataIntegrityError>,
}

impl RegistryReport {
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }
}

/// Outcome of attaching an admission-keyed event to a stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionResolution {
    Stay(StayId),
    /// No stay of this admission (and subject) is registered.
    Unknown,
    /// The admission has stays, but none covers the event time.
    OutOfWindow,
}

#[derive(Debug, Clone, Default)]
pub struct StayRegistry {
    stays: BTreeMap<StayId, Stay>,
    /// Stays of each admission ordered by `(intime, stay_id)`.
    by_admission: HashMap<AdmissionId, Vec<StayId>>,
}

impl StayRegistry {
    pub fn from_stays(stays: impl IntoIterator<Item = Stay>) -> Self {
        let mut map = BTreeMap::new();
        for stay in stays {
            map.entry(stay.stay_id).or_insert(stay);
        }
        Self::index(map)
    }

    /// Loads the stay index. Rows with an unparseable identifier or timestamp,
    /// an inverted window, or a repeated stay id are dropped and reported.
    pub fn from_frame(df: &DataFrame, timestamp_format: &str) -> Result<(Self, RegistryReport)> {
        let stay_ids = string_column(df, STAY_ID)?;
        let hadm_ids = string_column(df, HADM_ID)?;
        let subject_ids = string_column(df, SUBJECT_ID)?;
        let intimes = string_column(df, "intime")?;
        let outtimes = string_column(df, "outtime")?;

        let mut report = RegistryReport {
            rows_read: df.height(),
            dropped: Vec::new(),
        };
        let mut stays = BTreeMap::new();

        let rows = stay_ids
            .into_iter()
            .zip(hadm_ids.into_iter())
            .zip(subject_ids.into_iter())
            .zip(intimes.into_iter().zip(outtimes.into_iter()));
        for (row, (((stay_id, hadm_id), subject_id), (intime, outtime))) in rows.enumerate() {
            let parsed = parse_stay_row(
                row,
                [stay_id, hadm_id, subject_id],
                [intime, outtime],
                timestamp_format,
            );
            let stay = match parsed {
                Ok(stay) => stay,
                Err(error) => {
                    report.dropped.push(error);
                    continue;
                }
            };
            if stays.contains_key(&stay.stay_id) {
                report.dropped.push(DataIntegrityError::new(
                    row,
                    STAY_ID,
                    stay.stay_id.to_string(),
                    "duplicate stay id",
                ));
                continue;
            }
            stays.insert(stay.stay_id, stay);
        }

        if !report.dropped.is_empty() {
            tracing::warn!(
                dropped = report.dropped.len(),
                rows = report.rows_read,
                "stay index rows dropped"
            );
        }
        Ok((Self::index(stays), report))
    }

    /// Returns a registry whose stays carry age, sex and admission category.
    ///
    /// Either table may be absent; the matching attributes then stay unknown.
    pub fn with_demographics(
        &self,
        patients: Option<&DataFrame>,
        admissions: Option<&DataFrame>,
    ) -> Result<Self> {
        let mut by_subject: HashMap<SubjectId, (Option<String>, Option<f64>)> = HashMap::new();
        if let Some(df) = patients {
            let subjects = string_column(df, SUBJECT_ID)?;
            let genders = string_column(df, "gender")?;
            let ages = string_column(df, "anchor_age")?;
            for ((subject, gender), age) in subjects
                .into_iter()
                .zip(genders.into_iter())
                .zip(ages.into_iter())
            {
                if let Some(subject) = subject.and_then(parse_i64) {
                    let gender = gender.map(str::trim).filter(|g| !g.is_empty());
                    by_subject
                        .entry(subject)
                        .or_insert((gender.map(str::to_string), age.and_then(parse_f64)));
                }
            }
        }

        let mut by_admission: HashMap<AdmissionId, String> = HashMap::new();
        if let Some(df) = admissions {
            let hadms = string_column(df, HADM_ID)?;
            let kinds = string_column(df, "admission_type")?;
            for (hadm, kind) in hadms.into_iter().zip(kinds.into_iter()) {
                let kind = kind.map(str::trim).filter(|k| !k.is_empty());
                if let (Some(hadm), Some(kind)) = (hadm.and_then(parse_i64), kind) {
                    by_admission.entry(hadm).or_insert_with(|| kind.to_string());
                }
            }
        }

        let stays = self
            .stays
            .values()
            .map(|stay| {
                let mut stay = stay.clone();
                if let Some((gender, age)) = by_subject.get(&stay.subject_id) {
                    stay.demographics.gender.clone_from(gender);
                    stay.demographics.age = *age;
                }
                if let Some(kind) = by_admission.get(&stay.hadm_id) {
                    stay.demographics.admission_type = Some(kind.clone());
                }
                (stay.stay_id, stay)
            })
            .collect();
        Ok(Self::index(stays))
    }

    pub fn get(&self, stay_id: StayId) -> Option<&Stay> {
        self.stays.get(&stay_id)
    }

    pub fn contains(&self, stay_id: StayId) -> bool {
        self.stays.contains_key(&stay_id)
    }

    pub fn len(&self) -> usize {
        self.stays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stays.is_empty()
    }

    /// Stays in ascending stay id order.
    pub fn iter(&self) -> impl Iterator<Item = &Stay> {
        self.stays.values()
    }

    /// Stays of one admission, earliest first.
    pub fn stays_for_admission(&self, hadm_id: AdmissionId) -> &[StayId] {
        self.by_admission.get(&hadm_id).map_or(&[], Vec::as_slice)
    }

    /// Attaches an admission-keyed event to the stay whose `[intime, outtime]`
    /// covers `at`. A known subject id must match the stay's subject.
    pub fn resolve_admission(
        &self,
        hadm_id: AdmissionId,
        subject_id: Option<SubjectId>,
        at: NaiveDateTime,
    ) -> AdmissionResolution {
        let mut candidates = self
            .stays_for_admission(hadm_id)
            .iter()
            .filter_map(|id| self.stays.get(id))
            .filter(|stay| subject_id.is_none_or(|s| s == stay.subject_id))
            .peekable();
        if candidates.peek().is_none() {
            return AdmissionResolution::Unknown;
        }
        candidates
            .find(|stay| stay.contains(at))
            .map_or(AdmissionResolution::OutOfWindow, |stay| {
                AdmissionResolution::Stay(stay.stay_id)
            })
    }

    fn index(stays: BTreeMap<StayId, Stay>) -> Self {
        let mut by_admission: HashMap<AdmissionId, Vec<StayId>> = HashMap::new();
        for stay in stays.values() {
            by_admission.entry(stay.hadm_id).or_default().push(stay.stay_id);
        }
        for ids in by_admission.values_mut() {
            ids.sort_by_key(|id| stays.get(id).map(|s| (s.intime, s.stay_id)));
        }
        Self {
            stays,
            by_admission,
        }
    }
}

fn parse_stay_row(
    row: usize,
    ids: [Option<&str>; 3],
    times: [Option<&str>; 2],
    timestamp_format: &str,
) -> std::result::Result<Stay, DataIntegrityError> {
    let [stay_id, hadm_id, subject_id] = ids;
    let [intime, outtime] = times;

    let id = |column: &str, value: Option<&str>| {
        value.and_then(parse_i64).ok_or_else(|| {
            DataIntegrityError::new(row, column, value.unwrap_or_default(), "invalid identifier")
        })
    };
    let time = |column: &str, value: Option<&str>| {
        value
            .and_then(|v| parse_timestamp(v, timestamp_format))
            .ok_or_else(|| {
                DataIntegrityError::new(
                    row,
                    column,
                    value.unwrap_or_default(),
                    format!("expected timestamp format {timestamp_format}"),
                )
            })
    };

    let stay = Stay {
        stay_id: id(STAY_ID, stay_id)?,
        hadm_id: id(HADM_ID, hadm_id)?,
        subject_id: id(SUBJECT_ID, subject_id)?,
        intime: time("intime", intime)?,
        outtime: time("outtime", outtime)?,
        demographics: Demographics::default(),
    };
    if stay.outtime < stay.intime {
        return Err(DataIntegrityError::new(
            row,
            "outtime",
            stay.outtime.to_string(),
            "outtime precedes intime",
        ));
    }
    Ok(stay)
}
