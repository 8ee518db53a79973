use chrono::NaiveDateTime;

use crate::ids::{AdmissionId, StayId, SubjectId};

/// Time-independent attributes of a stay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Demographics {
    pub age: Option<f64>,
    pub gender: Option<String>,
    pub admission_type: Option<String>,
}

impl Demographics {
    /// 1 for female, 0 for anything else including unknown.
    pub fn gender_flag(&self) -> i32 {
        match self.gender.as_deref().map(str::trim) {
            Some(g) if g.eq_ignore_ascii_case("F") => 1,
            _ => 0,
        }
    }
}

/// One ICU stay. Created at registry load and never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct Stay {
    pub stay_id: StayId,
    pub hadm_id: AdmissionId,
    pub subject_id: SubjectId,
    pub intime: NaiveDateTime,
    pub outtime: NaiveDateTime,
    pub demographics: Demographics,
}

impl Stay {
    /// Inclusive on both ends.
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        timestamp >= self.intime && timestamp <= self.outtime
    }
}
