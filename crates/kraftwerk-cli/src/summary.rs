use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use kraftwerk_model::{Issue, Severity};

use kraftwerk_cli::types::{CheckReport, RunReport};

pub fn print_run_summary(report: &RunReport) {
    println!("Campaign: {}", report.campaign);
    match &report.output_dir {
        Some(dir) => println!("Output: {} ({} files)", dir.display(), report.written.len()),
        None => println!("Output: none (dry run)"),
    }
    let mut table = Table::new();
    table.set_header(vec![header_cell("Table"), header_cell("Rows")]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    let mut total_rows = 0usize;
    for (name, rows) in &report.outcome.row_counts {
        total_rows += rows;
        table.add_row(vec![
            Cell::new(name).fg(Color::Blue).add_attribute(Attribute::Bold),
            rows_cell(*rows),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(total_rows).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
    print_issue_table(&report.outcome.issues);
    println!(
        "Files processed: {}, warnings: {}",
        report.outcome.processed_files.len(),
        report.outcome.warnings().count()
    );
    if let Some(issue) = report.outcome.first_fatal() {
        eprintln!("Run failed: {issue}");
    }
}

pub fn print_check_summary(report: &CheckReport) {
    println!("Campaign: {}", report.campaign);
    println!("Multimode dataset: {}", report.multimode_dataset_name);
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Mode"),
        header_cell("Format"),
        header_cell("Data files"),
        header_cell("Groups"),
        header_cell("Variables"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 2..5 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for mode in &report.modes {
        table.add_row(vec![
            Cell::new(&mode.mode)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(mode.data_format),
            rows_cell(mode.data_files),
            Cell::new(mode.groups),
            Cell::new(mode.variables),
        ]);
    }
    println!("{table}");
    if !report.missing_scripts.is_empty() {
        eprintln!("Missing scripts:");
        for path in &report.missing_scripts {
            eprintln!("- {}", path.display());
        }
    }
}

fn print_issue_table(issues: &[Issue]) {
    if issues.is_empty() {
        return;
    }
    let mut ordered: Vec<&Issue> = issues.iter().collect();
    // Stable: fatal issues first, then order of occurrence.
    ordered.sort_by_key(|issue| !issue.is_fatal());

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Severity"),
        header_cell("Kind"),
        header_cell("Mode"),
        header_cell("Identifier"),
        header_cell("Message"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Center);
    for issue in ordered {
        table.add_row(vec![
            severity_cell(issue.severity),
            Cell::new(issue.kind.as_str()),
            optional_cell(issue.mode.as_deref()),
            optional_cell(issue.identifier.as_deref()),
            Cell::new(message(issue)),
        ]);
    }
    println!();
    println!("Issues:");
    println!("{table}");
}

fn message(issue: &Issue) -> String {
    let mut message = issue.message.clone();
    if let Some(file) = &issue.file {
        message.push_str(&format!(" [{}]", file.display()));
    }
    if let Some(fragment) = &issue.fragment {
        message.push_str(&format!(" (in `{fragment}`)"));
    }
    message
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(160);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn severity_cell(severity: Severity) -> Cell {
    match severity {
        Severity::Fatal => Cell::new("FATAL")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        Severity::Warning => Cell::new("WARN").fg(Color::Yellow),
    }
}

fn rows_cell(rows: usize) -> Cell {
    if rows == 0 {
        dim_cell(rows)
    } else {
        Cell::new(rows)
    }
}

fn optional_cell(value: Option<&str>) -> Cell {
    match value {
        Some(value) => Cell::new(value),
        None => dim_cell("-"),
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
