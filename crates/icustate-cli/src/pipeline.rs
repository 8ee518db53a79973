//! Pipeline run with explicit stages.
//!
//! 1. **Standards**: verify the manifest and build the transform tables
//! 2. **Registry**: read the stay index and attach demographics
//! 3. **Extract**: one hourly frame per event source, plus charted weight
//! 4. **Attributes**: per-stay age, sex, admission type, weight, readmission
//! 5. **Merge**: join every source on `(stay_id, hour_bin)`
//! 6. **Impute**: per-stay forward fill, then global median
//! 7. **Derive**: clinical scores, then the comorbidity index
//! 8. **Write**: project onto the output schema and write Parquet
//!
//! Each stage runs inside an `info_span!` named after it and logs its counts
//! with `duration_ms`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use icustate_ingest::{
    DiscoveredTables, RawTableReader, ReadOptions, StayRegistry, TableSpec, discover_tables,
    tables,
};
use icustate_model::{
    ExtractStats, FeatureMap, FeatureSource, ImputationReport, PipelineOptions, WriteReport,
};
use icustate_output::Materializer;
use icustate_standards::{StandardsRegistry, VerifySummary};
use icustate_transform::attributes::WEIGHT_RANGE_KG;
use icustate_transform::{
    AttributeReport, EventExtractor, HourlyFrame, MergeReport, StayFrame, TransformConfig,
    derive_features, impute, merge_hourly, stay_attributes, with_gcs_total, with_stay_scores,
};
use polars::prelude::DataFrame;
use tracing::{debug, info, info_span, trace, warn};

use crate::logging::redact_value;
use crate::types::{RegistrySummary, RunResult};

/// Where a run reads from and writes to.
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub data_dir: PathBuf,
    pub output: PathBuf,
    pub standards_dir: PathBuf,
    pub options: PipelineOptions,
}

impl PipelineInputs {
    fn read_options(&self) -> ReadOptions {
        ReadOptions::default()
            .with_chunk_rows(self.options.chunk_rows)
            .with_low_memory(self.options.low_memory)
    }
}

/// Runs every stage and writes the state table to `inputs.output`.
pub fn run_pipeline(inputs: &PipelineInputs) -> Result<RunResult> {
    let start = Instant::now();
    let options = &inputs.options;
    let read = inputs.read_options();
    let timestamp_format = options.timestamp_format.as_str();

    let (summary, config) = load_standards(&inputs.standards_dir, options)?;
    let tables = discover_tables(&inputs.data_dir)
        .with_context(|| format!("discover tables in {}", inputs.data_dir.display()))?;
    debug!(tables = tables.len(), "input tables discovered");

    let (registry, registry_summary) = build_registry(&tables, read, timestamp_format)?;
    let sources = extract_sources(&tables, &registry, &config, read, timestamp_format)?;
    let mut stats = sources.stats;
    let (attributes, attribute_report) =
        build_attributes(&tables, &registry, sources.weights.as_ref(), read)?;
    let (merged, merge_report) = merge(&sources.hourly, &attributes, &registry)?;
    let (imputed, imputation) = impute_stage(merged, &config)?;
    let (scored, diagnosis_stats) = derive(imputed, &tables, &registry, &config, read)?;
    stats.push(diagnosis_stats);
    let (absent_columns, write) = write_stage(&scored, &config, options, &inputs.output)?;

    Ok(RunResult {
        data_dir: inputs.data_dir.clone(),
        options: options.clone(),
        standards: summary,
        registry: registry_summary,
        sources: stats,
        attributes: attribute_report,
        merge: merge_report,
        imputation,
        absent_columns,
        write,
        duration_ms: start.elapsed().as_millis(),
    })
}

// ============================================================================
// Stage 1: Standards
// ============================================================================

/// Verifies the standards directory and builds the transform tables.
pub fn load_standards(
    standards_dir: &Path,
    options: &PipelineOptions,
) -> Result<(VerifySummary, TransformConfig)> {
    let span = info_span!("standards", dir = %standards_dir.display());
    let _guard = span.enter();
    let start = Instant::now();

    let (registry, summary) = StandardsRegistry::verify_and_load(standards_dir)
        .with_context(|| format!("load standards from {}", standards_dir.display()))?;
    let feature_maps = FeatureSource::ALL
        .into_iter()
        .map(|source| registry.feature_map(source))
        .collect::<Result<Vec<_>, _>>()
        .context("build feature maps")?;
    let config = TransformConfig::new(
        feature_maps,
        registry.comorbidity_categories(),
        registry.vasopressors.clone(),
        registry.output_schema.clone(),
        options.impute_default,
    );
    info!(
        features = summary.feature_count,
        items = summary.item_count,
        output_columns = summary.output_columns,
        duration_ms = start.elapsed().as_millis(),
        "standards verified"
    );
    Ok((summary, config))
}

// ============================================================================
// Stage 2: Registry
// ============================================================================

pub fn build_registry(
    tables: &DiscoveredTables,
    read: ReadOptions,
    timestamp_format: &str,
) -> Result<(StayRegistry, RegistrySummary)> {
    let span = info_span!("registry");
    let _guard = span.enter();
    let start = Instant::now();

    let path = tables.require(tables::ICUSTAYS).context("locate stay index")?;
    let stays = RawTableReader::new(tables::ICUSTAYS, path, read)
        .read()
        .context("read stay index")?;
    let (registry, report) =
        StayRegistry::from_frame(&stays, timestamp_format).context("build stay registry")?;
    for dropped in &report.dropped {
        trace!(
            row = dropped.row,
            column = %dropped.column,
            value = redact_value(&dropped.value),
            reason = %dropped.reason,
            "stay row dropped"
        );
    }
    if report.dropped_count() > 0 {
        warn!(dropped = report.dropped_count(), "stay index rows dropped");
    }

    let patients = read_optional(tables, tables::PATIENTS, read)?;
    let admissions = read_optional(tables, tables::ADMISSIONS, read)?;
    let registry = registry
        .with_demographics(patients.as_ref(), admissions.as_ref())
        .context("attach demographics")?;
    if registry.is_empty() {
        warn!("no valid stays; the output will be empty");
    }

    let summary = RegistrySummary {
        rows_read: report.rows_read,
        stays: registry.len(),
        dropped: report.dropped_count(),
    };
    info!(
        stays = summary.stays,
        rows_read = summary.rows_read,
        dropped = summary.dropped,
        duration_ms = start.elapsed().as_millis(),
        "registry built"
    );
    Ok((registry, summary))
}

// ============================================================================
// Stage 3: Extract
// ============================================================================

/// Per-source outputs of the extract stage.
#[derive(Debug)]
pub struct SourceFrames {
    pub hourly: Vec<HourlyFrame>,
    /// Charted per-stay weight, when a weight feature is configured.
    pub weights: Option<StayFrame>,
    pub stats: Vec<ExtractStats>,
}

pub fn extract_sources(
    tables: &DiscoveredTables,
    registry: &StayRegistry,
    config: &TransformConfig,
    read: ReadOptions,
    timestamp_format: &str,
) -> Result<SourceFrames> {
    let mut frames = SourceFrames {
        hourly: Vec::new(),
        weights: None,
        stats: Vec::new(),
    };

    // Vitals and charted weight share one filtered read of the largest table.
    let chart_items: BTreeSet<i64> = [FeatureSource::ChartEvents, FeatureSource::Weight]
        .into_iter()
        .filter_map(|source| config.feature_map(source))
        .flat_map(FeatureMap::item_ids)
        .collect();
    let charted = if chart_items.is_empty() {
        None
    } else {
        read_events(tables, tables::CHARTEVENTS, read, chart_items)?
    };

    if let Some(map) = config.feature_map(FeatureSource::ChartEvents) {
        let span = info_span!("extract", source = %FeatureSource::ChartEvents);
        let _guard = span.enter();
        let start = Instant::now();
        let extractor = EventExtractor::new(map, registry, timestamp_format);
        let extraction = match &charted {
            Some(df) => extractor.extract_frame(df, read.chunk_rows)?,
            None => extractor.empty()?,
        };
        let frame = with_gcs_total(extraction.frame).context("derive gcs_total")?;
        log_extraction(&extraction.stats, start);
        frames.hourly.push(frame);
        frames.stats.push(extraction.stats);
    }

    if let Some(map) = config.feature_map(FeatureSource::Weight) {
        let span = info_span!("extract", source = %FeatureSource::Weight);
        let _guard = span.enter();
        let start = Instant::now();
        let stats = match &charted {
            Some(df) => {
                let (above, below) = WEIGHT_RANGE_KG;
                let extraction = EventExtractor::new(map, registry, timestamp_format)
                    .with_value_range(above, below)
                    .extract_stays(df, read.chunk_rows)?;
                frames.weights = Some(extraction.frame);
                extraction.stats
            }
            None => ExtractStats::missing(FeatureSource::Weight.as_str()),
        };
        log_extraction(&stats, start);
        frames.stats.push(stats);
    }
    drop(charted);

    for source in [
        FeatureSource::LabEvents,
        FeatureSource::OutputEvents,
        FeatureSource::InputEvents,
    ] {
        let Some(map) = config.feature_map(source) else {
            debug!(%source, "no features configured");
            continue;
        };
        let span = info_span!("extract", %source);
        let _guard = span.enter();
        let start = Instant::now();
        let spec = tables::by_name(source.table())
            .ok_or_else(|| anyhow!("no raw table for source {source}"))?;
        let reader = tables
            .get(spec.name)
            .map(|path| RawTableReader::new(spec, path, read));
        let extraction = EventExtractor::new(map, registry, timestamp_format)
            .extract(reader.as_ref())
            .with_context(|| format!("extract {source}"))?;
        log_extraction(&extraction.stats, start);
        frames.hourly.push(extraction.frame);
        frames.stats.push(extraction.stats);
    }

    Ok(frames)
}

fn log_extraction(stats: &ExtractStats, start: Instant) {
    if stats.missing {
        warn!(source = %stats.source, "table not found; its features are null");
        return;
    }
    if stats.dropped() > 0 {
        warn!(
            source = %stats.source,
            malformed = stats.malformed,
            unresolved = stats.unresolved,
            out_of_window = stats.out_of_window,
            "event rows dropped"
        );
    }
    info!(
        rows_read = stats.rows_read,
        rows_selected = stats.rows_selected,
        groups = stats.groups,
        duration_ms = start.elapsed().as_millis(),
        "source extracted"
    );
}

// ============================================================================
// Stage 4: Attributes
// ============================================================================

pub fn build_attributes(
    tables: &DiscoveredTables,
    registry: &StayRegistry,
    charted_weights: Option<&StayFrame>,
    read: ReadOptions,
) -> Result<(StayFrame, AttributeReport)> {
    let span = info_span!("attributes");
    let _guard = span.enter();
    let start = Instant::now();

    let omr = read_optional(tables, tables::OMR, read)?;
    let (frame, report) =
        stay_attributes(registry, charted_weights, omr.as_ref()).context("build stay attributes")?;
    if report.missing_weights > 0 {
        debug!(missing = report.missing_weights, "stays without a plausible weight");
    }
    info!(
        stays = report.stays,
        charted_weights = report.charted_weights,
        outpatient_weights = report.outpatient_weights,
        readmissions = report.readmissions,
        duration_ms = start.elapsed().as_millis(),
        "stay attributes built"
    );
    Ok((frame, report))
}

// ============================================================================
// Stage 5: Merge
// ============================================================================

pub fn merge(
    hourly: &[HourlyFrame],
    attributes: &StayFrame,
    registry: &StayRegistry,
) -> Result<(HourlyFrame, MergeReport)> {
    let span = info_span!("merge");
    let _guard = span.enter();
    let start = Instant::now();

    let (frame, report) =
        merge_hourly(hourly, &[attributes], registry).context("merge sources")?;
    if report.dropped_unregistered > 0 {
        warn!(rows = report.dropped_unregistered, "source rows of unregistered stays dropped");
    }
    info!(
        rows = report.rows,
        stays = report.stays,
        columns = frame.feature_names().len(),
        duration_ms = start.elapsed().as_millis(),
        "sources merged"
    );
    Ok((frame, report))
}

// ============================================================================
// Stage 6: Impute
// ============================================================================

pub fn impute_stage(
    frame: HourlyFrame,
    config: &TransformConfig,
) -> Result<(HourlyFrame, ImputationReport)> {
    let span = info_span!("impute");
    let _guard = span.enter();
    let start = Instant::now();

    let (frame, report) = impute(frame, &config.imputation).context("impute missing values")?;
    info!(
        filled = report.total_filled(),
        defaulted_columns = report.warnings.len(),
        duration_ms = start.elapsed().as_millis(),
        "missing values imputed"
    );
    Ok((frame, report))
}

// ============================================================================
// Stage 7: Derive
// ============================================================================

/// Clinical scores on the imputed frame, then the per-stay comorbidity index.
pub fn derive(
    frame: HourlyFrame,
    tables: &DiscoveredTables,
    registry: &StayRegistry,
    config: &TransformConfig,
    read: ReadOptions,
) -> Result<(HourlyFrame, ExtractStats)> {
    let span = info_span!("derive");
    let _guard = span.enter();
    let start = Instant::now();

    let frame = derive_features(frame, &config.derivation).context("derive scores")?;

    let diagnoses = read_optional(tables, tables::DIAGNOSES_ICD, read)?;
    let (scores, stats) = config
        .classifier
        .score_stays(diagnoses.as_ref(), registry)
        .context("score comorbidities")?;
    drop(diagnoses);
    if stats.missing {
        warn!("diagnoses table not found; every comorbidity score is 0");
    } else if stats.dropped() > 0 {
        warn!(
            malformed = stats.malformed,
            unresolved = stats.unresolved,
            "diagnosis rows dropped"
        );
    }
    let frame = with_stay_scores(frame, &scores).context("join comorbidity scores")?;

    info!(
        rows = frame.height(),
        diagnoses = stats.rows_selected,
        duration_ms = start.elapsed().as_millis(),
        "scores derived"
    );
    Ok((frame, stats))
}

// ============================================================================
// Stage 8: Write
// ============================================================================

pub fn write_stage(
    frame: &HourlyFrame,
    config: &TransformConfig,
    options: &PipelineOptions,
    output: &Path,
) -> Result<(Vec<String>, WriteReport)> {
    let span = info_span!("write", path = %output.display());
    let _guard = span.enter();
    let start = Instant::now();

    let absent = config.assembler.report_absent(frame.data());
    let report = Materializer::from_options(options)
        .write(frame, &config.assembler, output)
        .with_context(|| format!("write {}", output.display()))?;
    info!(
        rows = report.rows,
        batches = report.batches,
        strategy = %report.selection.chosen,
        duration_ms = start.elapsed().as_millis(),
        "state table written"
    );
    Ok((absent, report))
}

fn read_optional(
    tables: &DiscoveredTables,
    spec: TableSpec,
    read: ReadOptions,
) -> Result<Option<DataFrame>> {
    let Some(path) = tables.get(spec.name) else {
        debug!(table = spec.name, "optional table not found");
        return Ok(None);
    };
    let df = RawTableReader::new(spec, path, read)
        .read()
        .with_context(|| format!("read {}", spec.name))?;
    debug!(table = spec.name, rows = df.height(), "table read");
    Ok(Some(df))
}

fn read_events(
    tables: &DiscoveredTables,
    spec: TableSpec,
    read: ReadOptions,
    items: BTreeSet<i64>,
) -> Result<Option<DataFrame>> {
    let Some(path) = tables.get(spec.name) else {
        debug!(table = spec.name, "optional table not found");
        return Ok(None);
    };
    let df = RawTableReader::new(spec, path, read)
        .read_items("itemid", items)
        .with_context(|| format!("read {}", spec.name))?;
    Ok(Some(df))
}
