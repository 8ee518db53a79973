use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use icustate_cli::types::RunResult;
use icustate_model::{ExtractStats, WriteStrategyKind};

pub fn print_summary(result: &RunResult) {
    println!("Data: {}", result.data_dir.display());
    println!("Output: {}", result.write.path.display());
    println!(
        "Stays: {} ({} index rows, {} dropped)",
        result.registry.stays, result.registry.rows_read, result.registry.dropped
    );
    println!(
        "Rows: {} hourly rows, {} stays with data",
        result.write.rows, result.merge.stays
    );
    print_strategy(result);

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Rows read"),
        header_cell("Selected"),
        header_cell("Malformed"),
        header_cell("Unresolved"),
        header_cell("Out of window"),
        header_cell("Groups"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..=6 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    let mut total = ExtractStats::new("TOTAL");
    for stats in &result.sources {
        total.absorb(stats);
        table.add_row(source_row(stats));
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(total.rows_read).add_attribute(Attribute::Bold),
        Cell::new(total.rows_selected).add_attribute(Attribute::Bold),
        count_cell(total.malformed, Color::Yellow).add_attribute(Attribute::Bold),
        count_cell(total.unresolved, Color::Yellow).add_attribute(Attribute::Bold),
        count_cell(total.out_of_window, Color::Yellow).add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    println!("{table}");

    print_attributes(result);
    print_warnings(result);
    println!("Finished in {} ms", result.duration_ms);
}

fn print_strategy(result: &RunResult) {
    let selection = &result.write.selection;
    match (&selection.chosen, &selection.fallback_reason) {
        (WriteStrategyKind::Streaming, _) => println!(
            "Write: streaming ({} batches)",
            result.write.batches
        ),
        (chosen, Some(reason)) => println!("Write: {chosen} ({reason})"),
        (chosen, None) => println!("Write: {chosen}"),
    }
}

fn source_row(stats: &ExtractStats) -> Vec<Cell> {
    if stats.missing {
        return vec![
            Cell::new(&stats.source),
            dim_cell("absent"),
            dim_cell("-"),
            dim_cell("-"),
            dim_cell("-"),
            dim_cell("-"),
            dim_cell("-"),
        ];
    }
    vec![
        Cell::new(&stats.source),
        Cell::new(stats.rows_read),
        Cell::new(stats.rows_selected),
        count_cell(stats.malformed, Color::Yellow),
        count_cell(stats.unresolved, Color::Yellow),
        count_cell(stats.out_of_window, Color::Yellow),
        Cell::new(stats.groups),
    ]
}

fn print_attributes(result: &RunResult) {
    let attributes = &result.attributes;
    let mut table = Table::new();
    table.set_header(vec![header_cell("Stay attribute"), header_cell("Stays")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    table.add_row(vec![Cell::new("charted weight"), Cell::new(attributes.charted_weights)]);
    table.add_row(vec![
        Cell::new("outpatient weight"),
        Cell::new(attributes.outpatient_weights),
    ]);
    table.add_row(vec![
        Cell::new("no weight"),
        count_cell(attributes.missing_weights, Color::Yellow),
    ]);
    table.add_row(vec![Cell::new("ICU readmission"), Cell::new(attributes.readmissions)]);
    println!("{table}");
}

fn print_warnings(result: &RunResult) {
    let imputed = &result.imputation.warnings;
    if imputed.is_empty() && result.absent_columns.is_empty() {
        return;
    }
    eprintln!("Warnings:");
    for warning in imputed {
        eprintln!("- {warning}");
    }
    if !result.absent_columns.is_empty() {
        eprintln!(
            "- not produced by any source, written as {}: {}",
            result.options.impute_default,
            result.absent_columns.join(", ")
        );
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(120);
}

pub fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

pub fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
