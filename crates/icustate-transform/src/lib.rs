//! Hourly feature engineering for ICU stays.
//!
//! Stages, in pipeline order:
//!
//! - [`extract`]: raw event tables to per-source hourly frames through the
//!   [`aggregate::ConditionalAggregator`]
//! - [`attributes`]: per-stay demographics, weight and readmission flag
//! - [`merge`]: outer join of the hourly sources, left join of stay tables
//! - [`impute`]: per-stay forward fill, then global median
//! - [`derive`] and [`comorbidity`]: clinical scores
//! - [`assemble`]: projection onto the output schema
//!
//! Every stage takes an immutable frame and returns a new one.

pub mod aggregate;
pub mod assemble;
pub mod attributes;
pub mod comorbidity;
pub mod config;
pub mod derive;
pub mod error;
pub mod extract;
pub mod fill;
pub mod frame;
pub mod impute;
pub mod merge;
pub mod readmission;
pub mod scores;

pub use aggregate::{ConditionalAggregator, GroupKey, Observation, StayHourKey, StayKey};
pub use assemble::{StateAssembler, with_stay_scores};
pub use attributes::{AttributeReport, stay_attributes};
pub use comorbidity::ComorbidityClassifier;
pub use config::TransformConfig;
pub use derive::{DerivationConfig, derive_features};
pub use error::{Result, TransformError};
pub use extract::{EventExtractor, Extraction, StayExtraction, with_gcs_total};
pub use frame::{HourlyFrame, KeyOrder, StayFrame};
pub use impute::{ImputationPolicy, impute};
pub use merge::{MergeReport, merge_hourly};
