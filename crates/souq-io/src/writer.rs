//! Export of tables, reports and the activity log.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use souq_core::audit::{ActivityLog, LogEntry};
use souq_core::model::{Dataset, RawTable};
use souq_core::schema::TableKind;
use tracing::info;

use crate::error::{DataError, DataResult};

/// Output format of an export, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> DataResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(ExportFormat::Csv),
            Some("json") => Ok(ExportFormat::Json),
            _ => Err(DataError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

fn create_file(path: &Path) -> DataResult<fs::File> {
    let write_error = |e: std::io::Error| DataError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::File::create(path).map_err(write_error)
}

/// Write a raw table as CSV (header row first) to any writer.
pub fn write_table_csv<W: Write>(writer: W, table: &RawTable) -> DataResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(&table.columns)?;
    for row in &table.rows {
        csv_writer.write_record(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write a raw table to a CSV file, creating parent directories.
pub fn write_csv(path: impl AsRef<Path>, table: &RawTable) -> DataResult<()> {
    let path = path.as_ref();
    write_table_csv(create_file(path)?, table)?;
    info!(table = %table.kind, path = %path.display(), rows = table.len(), "wrote CSV");
    Ok(())
}

/// Serialize any report as pretty JSON.
pub fn write_json<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> DataResult<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|e| DataError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(())
}

/// Export one cleaned table in the format named by `path`'s extension.
///
/// CSV keeps the derived columns so the file can be loaded and cleaned
/// again; JSON writes the typed records. Returns the number of rows.
pub fn export_table(dataset: &Dataset, kind: TableKind, path: impl AsRef<Path>) -> DataResult<usize> {
    let path = path.as_ref();
    match ExportFormat::from_path(path)? {
        ExportFormat::Csv => write_csv(path, &dataset.to_raw_table(kind))?,
        ExportFormat::Json => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            match kind {
                TableKind::Products => write_json(path, &dataset.products)?,
                TableKind::Stores => write_json(path, &dataset.stores)?,
                TableKind::Sales => write_json(path, &dataset.sales)?,
                TableKind::Inventory => write_json(path, &dataset.inventory)?,
                TableKind::Campaigns => write_json(path, &dataset.campaigns)?,
            }
        }
    }
    Ok(dataset.len_of(kind))
}

/// Write every table of `dataset` into `dir` as `<table>.<ext>`.
pub fn export_dataset(
    dataset: &Dataset,
    dir: impl AsRef<Path>,
    format: ExportFormat,
) -> DataResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| DataError::Write {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut written = Vec::with_capacity(TableKind::ALL.len());
    for kind in TableKind::ALL {
        let path = dir.join(format!("{}.{}", kind.name(), format.extension()));
        export_table(dataset, kind, &path)?;
        written.push(path);
    }
    Ok(written)
}

/// Write the activity log as CSV. Returns the number of entries written.
pub fn write_log_csv(path: impl AsRef<Path>, log: &ActivityLog) -> DataResult<usize> {
    let path = path.as_ref();
    let mut csv_writer = csv::Writer::from_writer(create_file(path)?);
    csv_writer.write_record(LogEntry::COLUMNS)?;
    for entry in log.entries() {
        csv_writer.write_record(entry.to_row())?;
    }
    csv_writer.flush()?;
    Ok(log.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use souq_core::audit::LogCategory;
    use tempfile::TempDir;

    #[test]
    fn test_csv_quotes_embedded_commas() {
        let mut table = RawTable::new(TableKind::Stores, vec!["store_id".into(), "fulfillment_type".into()]);
        table.push_row(vec!["S1".into(), "Own Fleet, Express".into()]);

        let mut out = Vec::new();
        write_table_csv(&mut out, &table).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "store_id,fulfillment_type\nS1,\"Own Fleet, Express\"\n"
        );
    }

    #[test]
    fn test_log_csv_has_header_and_details() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("activity.csv");
        let mut log = ActivityLog::default();
        log.info(LogCategory::Export, "exported sales", json!({"rows": 12}));

        assert_eq!(write_log_csv(&path, &log).unwrap(), 1);
        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("timestamp,level,category,message,details"));
        let row = lines.next().unwrap();
        assert!(row.contains("INFO,EXPORT,exported sales"));
        assert!(row.ends_with(r#""{""rows"":12}""#));
    }

    #[test]
    fn test_export_format_from_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("a.JSON")).unwrap(), ExportFormat::Json);
        assert!(ExportFormat::from_path(Path::new("a.xlsx")).is_err());
    }
}
