use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use comfy_table::{Cell, CellAlignment, Table};
use icustate_cli::pipeline::{PipelineInputs, run_pipeline};
use icustate_cli::settings::{OptionOverrides, load_options};
use icustate_cli::types::RunResult;
use icustate_standards::{StandardsRegistry, standards_root};
use tracing::info_span;

use crate::cli::{BuildArgs, StandardsArgs};
use crate::summary::{align_column, apply_table_style, header_cell};

pub fn run_build(args: &BuildArgs) -> Result<RunResult> {
    let span = info_span!("build", data_dir = %args.data_dir.display());
    let _guard = span.enter();

    let overrides = OptionOverrides {
        chunk_rows: args.chunk_rows,
        batch_rows: args.batch_rows,
        low_memory: args.low_memory,
        materialize: args.materialize,
        impute_default: args.impute_default,
        timestamp_format: args.timestamp_format.clone(),
    };
    let options = overrides.apply(load_options(args.config.as_deref())?);
    let inputs = PipelineInputs {
        data_dir: args.data_dir.clone(),
        output: args
            .output
            .clone()
            .unwrap_or_else(|| args.data_dir.join("state.parquet")),
        standards_dir: resolve_standards_dir(args.standards_dir.as_deref()),
        options,
    };
    let result = run_pipeline(&inputs)?;
    if let Some(path) = &args.report {
        write_report(&result, path)?;
    }
    Ok(result)
}

pub fn run_features(args: &StandardsArgs) -> Result<()> {
    let dir = resolve_standards_dir(args.standards_dir.as_deref());
    let (registry, _) = StandardsRegistry::verify_and_load(&dir)
        .with_context(|| format!("load standards from {}", dir.display()))?;
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Feature"),
        header_cell("Rule"),
        header_cell("Items"),
        header_cell("Label"),
    ]);
    apply_table_style(&mut table);
    for feature in &registry.features {
        let items = feature
            .item_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(feature.source),
            Cell::new(&feature.name),
            Cell::new(feature.rule),
            Cell::new(items),
            Cell::new(feature.label.as_deref().unwrap_or("-")),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_standards(args: &StandardsArgs) -> Result<()> {
    let dir = resolve_standards_dir(args.standards_dir.as_deref());
    let (_, summary) = StandardsRegistry::verify_and_load(&dir)
        .with_context(|| format!("load standards from {}", dir.display()))?;
    println!("Standards: {}", summary.standards_dir.display());
    let mut table = Table::new();
    table.set_header(vec![header_cell("Table"), header_cell("Entries")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    let rows = [
        ("manifest files", summary.file_count),
        ("features", summary.feature_count),
        ("item ids", summary.item_count),
        ("elixhauser icd9 categories", summary.icd9_categories),
        ("elixhauser icd10 categories", summary.icd10_categories),
        ("vasopressor factors", summary.vasopressor_count),
        ("output columns", summary.output_columns),
    ];
    for (label, count) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(count)]);
    }
    println!("{table}");
    println!(
        "Pins: source {}, comorbidity {}",
        summary.manifest_pins.source, summary.manifest_pins.comorbidity
    );
    Ok(())
}

fn resolve_standards_dir(explicit: Option<&Path>) -> PathBuf {
    explicit.map_or_else(standards_root, Path::to_path_buf)
}

fn write_report(result: &RunResult, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(result).context("serialize run report")?;
    fs::write(path, json).with_context(|| format!("write run report {}", path.display()))?;
    Ok(())
}
