//! Elixhauser comorbidity scoring from diagnosis codes.

use std::collections::{BTreeMap, BTreeSet};

use icustate_common::{i32_column, i64_column, parse_i64, string_column};
use icustate_ingest::StayRegistry;
use icustate_model::columns::{ELIXHAUSER_SCORE, HADM_ID, STAY_ID};
use icustate_model::{CodeSystem, ComorbidityCategory, ExtractStats, StayId};
use polars::prelude::DataFrame;
use tracing::info;

use crate::error::Result;
use crate::frame::StayFrame;

pub const DIAGNOSES_SOURCE: &str = "diagnoses_icd";

/// Prefix tables of both code systems.
#[derive(Debug, Clone, Default)]
pub struct ComorbidityClassifier {
    icd9: Vec<ComorbidityCategory>,
    icd10: Vec<ComorbidityCategory>,
}

impl ComorbidityClassifier {
    pub fn new<'a>(categories: impl IntoIterator<Item = &'a ComorbidityCategory>) -> Self {
        let (icd9, icd10): (Vec<_>, Vec<_>) = categories
            .into_iter()
            .cloned()
            .partition(|category| category.system == CodeSystem::Icd9);
        Self { icd9, icd10 }
    }

    /// Names of the categories whose prefixes match `code`.
    pub fn classify<'s>(&'s self, code: &str, system: CodeSystem) -> impl Iterator<Item = &'s str> {
        let code = code.trim().to_ascii_uppercase();
        self.table(system)
            .iter()
            .filter(move |category| category.matches(&code))
            .map(|category| category.name.as_str())
    }

    /// One `elixhauser_score` per registered stay.
    ///
    /// A diagnosis applies to every stay of its admission. The score is the
    /// number of distinct categories matched; stays without diagnoses score 0.
    pub fn score_stays(
        &self,
        diagnoses: Option<&DataFrame>,
        registry: &StayRegistry,
    ) -> Result<(StayFrame, ExtractStats)> {
        let mut matched: BTreeMap<StayId, BTreeSet<&str>> = BTreeMap::new();
        let stats = match diagnoses {
            Some(df) => self.collect(df, registry, &mut matched)?,
            None => ExtractStats::missing(DIAGNOSES_SOURCE),
        };

        let (stays, scores): (Vec<_>, Vec<_>) = registry
            .iter()
            .map(|stay| {
                let score = matched.get(&stay.stay_id).map_or(0, BTreeSet::len);
                (Some(stay.stay_id), Some(i32::try_from(score).unwrap_or(i32::MAX)))
            })
            .unzip();
        let data = DataFrame::new(vec![
            i64_column(STAY_ID, stays),
            i32_column(ELIXHAUSER_SCORE, scores),
        ])?;
        Ok((StayFrame::new("comorbidity", data)?, stats))
    }

    fn collect<'s>(
        &'s self,
        df: &DataFrame,
        registry: &StayRegistry,
        matched: &mut BTreeMap<StayId, BTreeSet<&'s str>>,
    ) -> Result<ExtractStats> {
        let mut stats = ExtractStats::new(DIAGNOSES_SOURCE);
        let admissions = string_column(df, HADM_ID)?;
        let codes = string_column(df, "icd_code")?;
        let versions = string_column(df, "icd_version")?;
        let rows = admissions
            .into_iter()
            .zip(codes.into_iter())
            .zip(versions.into_iter());
        for ((hadm, code), version) in rows {
            stats.rows_read += 1;
            let code = code.map(str::trim).filter(|c| !c.is_empty());
            let (Some(hadm), Some(code), Some(version)) =
                (hadm.and_then(parse_i64), code, version.and_then(parse_i64))
            else {
                stats.malformed += 1;
                continue;
            };
            let stays = registry.stays_for_admission(hadm);
            if stays.is_empty() {
                stats.unresolved += 1;
                continue;
            }
            stats.rows_selected += 1;
            let categories: Vec<&str> = self.classify(code, CodeSystem::from_version(version)).collect();
            if categories.is_empty() {
                continue;
            }
            for stay in stays {
                matched.entry(*stay).or_default().extend(categories.iter().copied());
            }
        }
        stats.groups = matched.len();
        info!(
            rows_read = stats.rows_read,
            malformed = stats.malformed,
            unresolved = stats.unresolved,
            stays_with_comorbidities = stats.groups,
            "diagnoses classified"
        );
        Ok(stats)
    }

    fn table(&self, system: CodeSystem) -> &[ComorbidityCategory] {
        match system {
            CodeSystem::Icd9 => &self.icd9,
            CodeSystem::Icd10 => &self.icd10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use icustate_common::i32_values;
    use icustate_model::Stay;
    use polars::prelude::{Column, NamedFrom, Series};

    fn categories() -> Vec<ComorbidityCategory> {
        let p = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
        vec![
            ComorbidityCategory::new("chf", CodeSystem::Icd9, p(&["428", "4254"])),
            ComorbidityCategory::new("hypertension", CodeSystem::Icd9, p(&["401"])),
            ComorbidityCategory::new("chf", CodeSystem::Icd10, p(&["I50"])),
            ComorbidityCategory::new("diabetes", CodeSystem::Icd10, p(&["E11"])),
        ]
    }

    fn registry() -> StayRegistry {
        let intime = NaiveDate::from_ymd_opt(2150, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        StayRegistry::from_stays([(1, 10), (2, 10), (3, 30)].map(|(stay_id, hadm_id)| Stay {
            stay_id,
            hadm_id,
            subject_id: 5,
            intime: intime + chrono::Duration::days(stay_id),
            outtime: intime + chrono::Duration::days(stay_id) + chrono::Duration::hours(5),
            demographics: Default::default(),
        }))
    }

    fn text(name: &str, values: &[&str]) -> Column {
        Series::new(name.into(), values.to_vec()).into()
    }

    #[test]
    fn code_system_selects_prefix_table() {
        let classifier = ComorbidityClassifier::new(&categories());
        assert_eq!(classifier.classify(" 4280 ", CodeSystem::Icd9).collect::<Vec<_>>(), vec!["chf"]);
        assert_eq!(classifier.classify("4280", CodeSystem::Icd10).count(), 0);
        assert_eq!(classifier.classify("i509", CodeSystem::Icd10).collect::<Vec<_>>(), vec!["chf"]);
    }

    #[test]
    fn score_counts_distinct_categories_per_stay() {
        let classifier = ComorbidityClassifier::new(&categories());
        let diagnoses = DataFrame::new(vec![
            text("hadm_id", &["10", "10", "10", "99", "10"]),
            text("icd_code", &["4280", "4254", "E119", "4010", ""]),
            text("icd_version", &["9", "9", "10", "9", "9"]),
        ])
        .unwrap();
        let (frame, stats) = classifier.score_stays(Some(&diagnoses), &registry()).unwrap();
        assert_eq!(
            i32_values(frame.data(), ELIXHAUSER_SCORE).unwrap(),
            vec![Some(2), Some(2), Some(0)]
        );
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.groups, 2);
    }

    #[test]
    fn missing_diagnoses_score_zero() {
        let classifier = ComorbidityClassifier::new(&categories());
        let (frame, stats) = classifier.score_stays(None, &registry()).unwrap();
        assert!(stats.missing);
        assert_eq!(
            i32_values(frame.data(), ELIXHAUSER_SCORE).unwrap(),
            vec![Some(0); 3]
        );
    }
}
