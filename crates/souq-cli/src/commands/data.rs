//! Dataset commands: generate, clean, quality and export.

use std::path::Path;

use serde_json::json;
use souq_core::{AppState, LogCategory, QualityReport, TableKind};
use souq_io::ExportFormat;

use crate::colors;
use crate::config::AppConfig;
use crate::output::{self, format_number, format_pct, print_header, print_table};
use crate::source::{self, FilterArgs, GenerateArgs, SourceArgs};

/// Write a synthetic dataset to `out`, raw (with its defects) unless `cleaned`.
pub fn generate(
    state: &mut AppState,
    config: &AppConfig,
    args: &GenerateArgs,
    out: &Path,
    cleaned: bool,
) -> anyhow::Result<()> {
    let generator = args.apply(&config.generator);
    let data = state.generate(&generator)?;

    print_header(
        "Generated dataset",
        Some(
            format!(
                "seed {}, {} days to {}",
                generator.seed, generator.days_of_data, generator.end_date
            )
            .as_str(),
        ),
    );

    let mut rows = Vec::new();
    if cleaned {
        let written = souq_io::export_dataset(state.dataset(), out, ExportFormat::Csv)?;
        for (path, kind) in written.iter().zip(TableKind::ALL) {
            rows.push(vec![
                path.display().to_string(),
                format_number(state.dataset().len_of(kind) as f64),
            ]);
        }
    } else {
        for table in data.to_raw_dataset().tables() {
            let path = out.join(format!("{}.csv", table.kind));
            souq_io::write_csv(&path, table)?;
            rows.push(vec![path.display().to_string(), format_number(table.len() as f64)]);
        }
    }
    print_table(&["file", "rows"], &rows);

    state.log_mut().info(
        LogCategory::Export,
        format!("wrote generated tables to {}", out.display()),
        json!({ "cleaned": cleaned, "files": rows.len() }),
    );
    output::done(format!("{} files in {}", rows.len(), out.display()));
    Ok(())
}

/// Clean the source tables and write them plus `quality.json` to `out`.
pub fn clean(
    state: &mut AppState,
    config: &AppConfig,
    source: &SourceArgs,
    out: &Path,
    format: ExportFormat,
) -> anyhow::Result<()> {
    source::load(state, source, config)?;

    let written = souq_io::export_dataset(state.dataset(), out, format)?;
    let report_path = out.join("quality.json");
    souq_io::write_json(&report_path, state.quality())?;

    print_quality(state.quality());
    state.log_mut().info(
        LogCategory::Export,
        format!("wrote cleaned tables to {}", out.display()),
        json!({ "files": written.len() + 1 }),
    );
    output::done(format!("{} tables and quality.json in {}", written.len(), out.display()));
    Ok(())
}

pub fn quality(state: &mut AppState, config: &AppConfig, source: &SourceArgs, json: bool) -> anyhow::Result<()> {
    source::load(state, source, config)?;
    if json {
        return output::print_json(state.quality());
    }
    print_quality(state.quality());
    Ok(())
}

fn print_quality(report: &QualityReport) {
    print_header("Data quality", None);
    let summary: Vec<Vec<String>> = report
        .tables
        .iter()
        .map(|t| {
            vec![
                t.table.to_string(),
                t.input_rows.to_string(),
                t.output_rows.to_string(),
                t.duplicates_removed.to_string(),
                t.summary.missing_cells.to_string(),
                format_pct(t.summary.completeness_pct),
            ]
        })
        .collect();
    print_table(
        &["table", "rows in", "rows out", "duplicates", "missing cells", "complete"],
        &summary,
    );

    let issues: Vec<_> = report.issues().collect();
    if issues.is_empty() {
        println!("\n  {}No issues detected{}", colors::GREEN, colors::RESET);
        return;
    }

    let affected = format!("{} rows affected", report.total_affected_rows());
    print_header("Issues", Some(affected.as_str()));
    let rows: Vec<Vec<String>> = issues
        .iter()
        .map(|issue| {
            vec![
                issue.table.to_string(),
                issue.kind.as_str().to_string(),
                issue.affected_rows.to_string(),
                format_pct(issue.pct),
                issue.description.clone(),
            ]
        })
        .collect();
    print_table(&["table", "issue", "rows", "share", "description"], &rows);
}

/// Which tables an export covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportTable {
    All,
    Products,
    Stores,
    Sales,
    Inventory,
    Campaigns,
}

impl ExportTable {
    fn kind(self) -> Option<TableKind> {
        match self {
            ExportTable::All => None,
            ExportTable::Products => Some(TableKind::Products),
            ExportTable::Stores => Some(TableKind::Stores),
            ExportTable::Sales => Some(TableKind::Sales),
            ExportTable::Inventory => Some(TableKind::Inventory),
            ExportTable::Campaigns => Some(TableKind::Campaigns),
        }
    }
}

/// Export the filtered view of one table to a file, or of every table to a directory.
///
/// A single table's format follows the file extension; `format` applies to
/// directory exports.
pub fn export(
    state: &mut AppState,
    config: &AppConfig,
    source: &SourceArgs,
    filter: &FilterArgs,
    table: ExportTable,
    output_path: &Path,
    format: ExportFormat,
) -> anyhow::Result<()> {
    source::load(state, source, config)?;
    let filter = filter.filter();
    let view = state.filtered(&filter);

    let (files, rows) = match table.kind() {
        Some(kind) => {
            let rows = souq_io::export_table(&view, kind, output_path)?;
            println!("{}{kind}{}: {rows} rows → {}", colors::CYAN, colors::RESET, output_path.display());
            (1, rows)
        }
        None => {
            let written = souq_io::export_dataset(&view, output_path, format)?;
            let rows: usize = TableKind::ALL.iter().map(|kind| view.len_of(*kind)).sum();
            for (path, kind) in written.iter().zip(TableKind::ALL) {
                println!("{}{kind}{}: {} rows → {}", colors::CYAN, colors::RESET, view.len_of(kind), path.display());
            }
            (written.len(), rows)
        }
    };

    state.log_mut().info(
        LogCategory::Export,
        format!("exported {files} file(s)"),
        json!({
            "path": output_path.display().to_string(),
            "segment": filter.to_string(),
            "rows": rows,
        }),
    );
    Ok(())
}
