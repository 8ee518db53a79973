#![deny(unsafe_code)]

use std::fmt;

use chrono::{DateTime, NaiveDateTime};

pub type StayId = i64;
pub type AdmissionId = i64;
pub type SubjectId = i64;

pub const MILLIS_PER_HOUR: i64 = 3_600_000;

/// A timestamp truncated to its containing clock hour, stored as epoch milliseconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct HourBucket(i64);

impl HourBucket {
    pub fn from_millis(millis: i64) -> Self {
        Self(millis.div_euclid(MILLIS_PER_HOUR) * MILLIS_PER_HOUR)
    }

    pub fn from_datetime(timestamp: NaiveDateTime) -> Self {
        Self::from_millis(timestamp.and_utc().timestamp_millis())
    }

    pub fn as_millis(self) -> i64 {
        self.0
    }

    pub fn to_datetime(self) -> Option<NaiveDateTime> {
        DateTime::from_timestamp_millis(self.0).map(|dt| dt.naive_utc())
    }
}

impl fmt::Display for HourBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:00")),
            None => write!(f, "{}ms", self.0),
        }
    }
}
