//! Source extractors: raw event tables to hourly feature frames.
//!
//! An extractor keeps the rows whose item belongs to its feature map, parses
//! the value, timestamp and entity link, resolves the link to a registered
//! stay and folds the row through a [`ConditionalAggregator`]. Rows that
//! cannot be parsed or resolved are dropped and counted in [`ExtractStats`].

use chrono::NaiveDateTime;
use icustate_common::{f64_column, parse_f64, parse_i64, parse_timestamp, string_column};
use icustate_ingest::{AdmissionResolution, RawTableReader, StayRegistry, for_each_chunk};
use icustate_model::columns::{GCS_EYE, GCS_MOTOR, GCS_TOTAL, GCS_VERBAL, HADM_ID, STAY_ID, SUBJECT_ID};
use icustate_model::{ExtractStats, FeatureMap, FeatureSource, HourBucket, StayId};
use polars::prelude::DataFrame;
use tracing::{debug, info};

use crate::aggregate::{ConditionalAggregator, GroupKey, Observation, StayHourKey, StayKey};
use crate::error::{Result, TransformError};
use crate::frame::{HourlyFrame, StayFrame};

/// How an event row names its stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityLink {
    /// The row carries the stay id directly.
    Stay { column: &'static str },
    /// The row carries an admission (and subject) id; the stay is the one
    /// whose window covers the event time.
    Admission {
        hadm: &'static str,
        subject: &'static str,
    },
}

/// Raw column names an extractor reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventColumns {
    pub link: EntityLink,
    pub item: &'static str,
    pub time: &'static str,
    pub value: &'static str,
}

impl EventColumns {
    pub fn for_source(source: FeatureSource) -> Self {
        let stay = EntityLink::Stay { column: STAY_ID };
        match source {
            FeatureSource::ChartEvents | FeatureSource::Weight => Self {
                link: stay,
                item: "itemid",
                time: "charttime",
                value: "valuenum",
            },
            FeatureSource::LabEvents => Self {
                link: EntityLink::Admission {
                    hadm: HADM_ID,
                    subject: SUBJECT_ID,
                },
                item: "itemid",
                time: "charttime",
                value: "valuenum",
            },
            FeatureSource::OutputEvents => Self {
                link: stay,
                item: "itemid",
                time: "charttime",
                value: "value",
            },
            FeatureSource::InputEvents => Self {
                link: stay,
                item: "itemid",
                time: "starttime",
                value: "amount",
            },
        }
    }
}

/// Open interval of accepted values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub above: f64,
    pub below: f64,
}

impl ValueRange {
    pub fn contains(self, value: f64) -> bool {
        value > self.above && value < self.below
    }
}

/// An hourly source table with its extraction counters.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub frame: HourlyFrame,
    pub stats: ExtractStats,
}

/// A per-stay source table with its extraction counters.
#[derive(Debug, Clone)]
pub struct StayExtraction {
    pub frame: StayFrame,
    pub stats: ExtractStats,
}

#[derive(Debug, Clone)]
pub struct EventExtractor<'a> {
    features: &'a FeatureMap,
    registry: &'a StayRegistry,
    columns: EventColumns,
    timestamp_format: &'a str,
    value_range: Option<ValueRange>,
}

impl<'a> EventExtractor<'a> {
    pub fn new(features: &'a FeatureMap, registry: &'a StayRegistry, timestamp_format: &'a str) -> Self {
        Self {
            features,
            registry,
            columns: EventColumns::for_source(features.source()),
            timestamp_format,
            value_range: None,
        }
    }

    /// Ignores values outside the open interval `(above, below)`.
    pub fn with_value_range(mut self, above: f64, below: f64) -> Self {
        self.value_range = Some(ValueRange { above, below });
        self
    }

    pub fn source(&self) -> FeatureSource {
        self.features.source()
    }

    /// Hourly features of the table, or all-null features when it is absent.
    ///
    /// Only rows of the configured items are loaded, so `rows_read` counts
    /// those rows rather than the whole file.
    pub fn extract(&self, reader: Option<&RawTableReader>) -> Result<Extraction> {
        let Some(reader) = reader else {
            return self.empty();
        };
        let df = reader.read_items(self.columns.item, self.features.item_ids())?;
        self.extract_frame(&df, reader.options().chunk_rows)
    }

    /// Hourly features of an already loaded raw table.
    pub fn extract_frame(&self, df: &DataFrame, chunk_rows: usize) -> Result<Extraction> {
        let (data, stats) = self.aggregate(df, chunk_rows, |stay, at| {
            StayHourKey::new(stay, HourBucket::from_datetime(at))
        })?;
        let frame = HourlyFrame::new(self.source().as_str(), data)?;
        Ok(Extraction { frame, stats })
    }

    /// Per-stay features of an already loaded raw table.
    pub fn extract_stays(&self, df: &DataFrame, chunk_rows: usize) -> Result<StayExtraction> {
        let (data, stats) = self.aggregate(df, chunk_rows, |stay, _| StayKey(stay))?;
        let frame = StayFrame::new(self.source().as_str(), data)?;
        Ok(StayExtraction { frame, stats })
    }

    /// Result for a source whose table was not found.
    pub fn empty(&self) -> Result<Extraction> {
        let source = self.source().as_str();
        Ok(Extraction {
            frame: HourlyFrame::empty(source, self.features.names())?,
            stats: ExtractStats::missing(source),
        })
    }

    fn aggregate<K: GroupKey>(
        &self,
        df: &DataFrame,
        chunk_rows: usize,
        key: impl Fn(StayId, NaiveDateTime) -> K,
    ) -> Result<(DataFrame, ExtractStats)> {
        let mut stats = ExtractStats::new(self.source().as_str());
        let mut aggregator = ConditionalAggregator::new(self.features);
        for_each_chunk(df, chunk_rows, |offset, chunk| {
            self.fold_chunk(&chunk, &mut aggregator, &mut stats, &key)?;
            debug!(source = %self.source(), offset, rows = chunk.height(), "chunk folded");
            Ok::<(), TransformError>(())
        })?;
        stats.groups = aggregator.group_count();
        info!(
            source = %self.source(),
            rows_read = stats.rows_read,
            rows_selected = stats.rows_selected,
            malformed = stats.malformed,
            unresolved = stats.unresolved,
            out_of_window = stats.out_of_window,
            groups = stats.groups,
            "source aggregated"
        );
        Ok((aggregator.finish()?, stats))
    }

    fn fold_chunk<K: GroupKey>(
        &self,
        chunk: &DataFrame,
        aggregator: &mut ConditionalAggregator<'_, K>,
        stats: &mut ExtractStats,
        key: &impl Fn(StayId, NaiveDateTime) -> K,
    ) -> Result<()> {
        let items = string_column(chunk, self.columns.item)?;
        let times = string_column(chunk, self.columns.time)?;
        let values = string_column(chunk, self.columns.value)?;
        let links = match self.columns.link {
            EntityLink::Stay { column } => (string_column(chunk, column)?, None),
            EntityLink::Admission { hadm, subject } => (
                string_column(chunk, hadm)?,
                Some(string_column(chunk, subject)?),
            ),
        };
        let (link_ids, subject_ids) = links;

        for row in 0..chunk.height() {
            stats.rows_read += 1;
            let Some(item_id) = items.get(row).and_then(parse_i64) else {
                stats.malformed += 1;
                continue;
            };
            if !self.features.contains_item(item_id) {
                continue;
            }
            stats.rows_selected += 1;

            let value = values.get(row).and_then(parse_f64);
            let at = times
                .get(row)
                .and_then(|t| parse_timestamp(t, self.timestamp_format));
            let link = link_ids.get(row).and_then(parse_i64);
            let (Some(value), Some(at), Some(link)) = (value, at, link) else {
                stats.malformed += 1;
                continue;
            };
            if self.value_range.is_some_and(|range| !range.contains(value)) {
                continue;
            }

            let stay_id = match &subject_ids {
                None if self.registry.contains(link) => link,
                None => {
                    stats.unresolved += 1;
                    continue;
                }
                Some(subjects) => {
                    let subject = subjects.get(row).and_then(parse_i64);
                    match self.registry.resolve_admission(link, subject, at) {
                        AdmissionResolution::Stay(stay_id) => stay_id,
                        AdmissionResolution::Unknown => {
                            stats.unresolved += 1;
                            continue;
                        }
                        AdmissionResolution::OutOfWindow => {
                            stats.out_of_window += 1;
                            continue;
                        }
                    }
                }
            };

            aggregator.fold(Observation {
                key: key(stay_id, at),
                item_id,
                value,
                at_ms: at.and_utc().timestamp_millis(),
            });
        }
        Ok(())
    }
}

/// Adds `gcs_total`, the sum of the GCS components present in each hour.
///
/// Null when all three components are absent. A frame without any component
/// column is returned unchanged.
pub fn with_gcs_total(frame: HourlyFrame) -> Result<HourlyFrame> {
    let components = [GCS_EYE, GCS_VERBAL, GCS_MOTOR];
    if components.iter().all(|c| frame.data().column(c).is_err()) {
        return Ok(frame);
    }
    let mut totals: Vec<Option<f64>> = vec![None; frame.height()];
    for component in components {
        for (total, value) in totals.iter_mut().zip(frame.f64_or_null(component)?) {
            if let Some(value) = value {
                *total = Some(total.unwrap_or(0.0) + value);
            }
        }
    }
    let mut data = frame.data().clone();
    data.with_column(f64_column(GCS_TOTAL, totals))?;
    frame.with_data(data)
}
