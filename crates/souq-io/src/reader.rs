//! Table ingestion from CSV and spreadsheet files.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, open_workbook_auto};
use chrono::NaiveTime;
use souq_core::model::{DATE_FORMAT, RawDataset, RawTable, TIMESTAMP_FORMAT};
use souq_core::schema::{ColumnMap, TableKind};
use tracing::{debug, info, warn};

use crate::error::{DataError, DataResult};

/// Extensions recognised as input tables, in lookup priority order.
pub const TABLE_EXTENSIONS: [&str; 4] = ["csv", "xlsx", "xls", "ods"];

/// On-disk format of an input table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Spreadsheet,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> DataResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(InputFormat::Csv),
            Some("xlsx" | "xls" | "xlsm" | "xlsb" | "ods") => Ok(InputFormat::Spreadsheet),
            _ => Err(DataError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Read a CSV file into a raw table of trimmed string cells.
///
/// Short rows are allowed; their missing trailing cells read as blank.
pub fn read_csv(path: impl AsRef<Path>, kind: TableKind) -> DataResult<RawTable> {
    let path = path.as_ref();
    let file = fs::File::open(path).map_err(|e| DataError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    read_csv_from(file, kind)
}

/// Read CSV from any reader.
pub fn read_csv_from<R: Read>(reader: R, kind: TableKind) -> DataResult<RawTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = csv_reader.headers()?.iter().map(String::from).collect();
    let mut table = RawTable::new(kind, columns);
    for record in csv_reader.records() {
        let record = record?;
        table.push_row(record.iter().map(String::from).collect());
    }
    Ok(table)
}

/// Read one sheet of a workbook into a raw table.
///
/// A sheet named after the table is preferred; otherwise the first sheet
/// is used. The first row is the header.
pub fn read_spreadsheet(path: impl AsRef<Path>, kind: TableKind) -> DataResult<RawTable> {
    let path = path.as_ref();
    let spreadsheet_error = |message: String| DataError::Spreadsheet {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| spreadsheet_error(e.to_string()))?;
    let names = workbook.sheet_names();
    let sheet = names
        .iter()
        .find(|name| TableKind::from_name(name) == Some(kind))
        .or_else(|| names.first())
        .cloned()
        .ok_or_else(|| spreadsheet_error("workbook has no sheets".to_string()))?;
    debug!(sheet = %sheet, table = %kind, "reading worksheet");

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| spreadsheet_error(e.to_string()))?;
    let mut rows = range.rows();
    let columns = rows
        .next()
        .map(|header| header.iter().map(cell_text).collect())
        .unwrap_or_default();

    let mut table = RawTable::new(kind, columns);
    for row in rows {
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        table.push_row(cells);
    }
    Ok(table)
}

/// Render a workbook cell the way the same value would appear in a CSV.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(t) if t.time() == NaiveTime::MIN => t.format(DATE_FORMAT).to_string(),
            Some(t) => t.format(TIMESTAMP_FORMAT).to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        // Formula errors (#N/A, #DIV/0!) read as missing.
        Data::Error(_) => String::new(),
    }
}

/// Read a table file in whichever format its extension names and check its
/// header against the table's schema.
pub fn load_table(path: impl AsRef<Path>, kind: TableKind) -> DataResult<RawTable> {
    let path = path.as_ref();
    let table = match InputFormat::from_path(path)? {
        InputFormat::Csv => read_csv(path, kind)?,
        InputFormat::Spreadsheet => read_spreadsheet(path, kind)?,
    };
    ColumnMap::resolve(&table)?;
    info!(
        table = %kind,
        path = %path.display(),
        rows = table.len(),
        columns = table.columns.len(),
        "loaded table"
    );
    Ok(table)
}

/// A table that failed to load.
#[derive(Debug)]
pub struct LoadFailure {
    pub table: TableKind,
    pub path: PathBuf,
    pub error: DataError,
}

/// Result of loading a directory: whatever loaded, plus what did not.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub raw: RawDataset,
    pub failures: Vec<LoadFailure>,
    /// Tables with no matching file in the directory.
    pub missing: Vec<TableKind>,
}

impl LoadOutcome {
    pub fn loaded(&self) -> usize {
        self.raw.tables().count()
    }
}

/// Locate the input file for `kind` in `dir`: `<table>.<ext>`, matched
/// case-insensitively, preferring extensions in [`TABLE_EXTENSIONS`] order.
pub fn find_table_file(dir: impl AsRef<Path>, kind: TableKind) -> DataResult<Option<PathBuf>> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|e| DataError::Read {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut best: Option<(usize, PathBuf)> = None;
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let stem = path.file_stem().and_then(|s| s.to_str());
        if stem.and_then(TableKind::from_name) != Some(kind) {
            continue;
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let Some(priority) = TABLE_EXTENSIONS.iter().position(|known| *known == ext) else {
            continue;
        };
        if best.as_ref().is_none_or(|(current, _)| priority < *current) {
            best = Some((priority, path));
        }
    }
    Ok(best.map(|(_, path)| path))
}

/// Load every table found in `dir`.
///
/// Tables load independently: a malformed file is recorded as a failure
/// and the remaining tables still load.
pub fn load_dir(dir: impl AsRef<Path>) -> DataResult<LoadOutcome> {
    let dir = dir.as_ref();
    let mut outcome = LoadOutcome::default();

    for kind in TableKind::ALL {
        let Some(path) = find_table_file(dir, kind)? else {
            debug!(table = %kind, dir = %dir.display(), "no input file");
            outcome.missing.push(kind);
            continue;
        };
        match load_table(&path, kind) {
            Ok(table) => outcome.raw.insert(table),
            Err(error) => {
                warn!(table = %kind, path = %path.display(), %error, "table failed to load");
                outcome.failures.push(LoadFailure {
                    table: kind,
                    path,
                    error,
                });
            }
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(InputFormat::from_path(Path::new("sales.CSV")).unwrap(), InputFormat::Csv);
        assert_eq!(
            InputFormat::from_path(Path::new("stores.xlsx")).unwrap(),
            InputFormat::Spreadsheet
        );
        assert!(matches!(
            InputFormat::from_path(Path::new("notes.txt")),
            Err(DataError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_csv_rows_are_trimmed_and_may_be_short() {
        let data = "\u{feff}Store ID, City ,Channel\n S1 ,Dubai,App\nS2,DXB\n";
        let table = read_csv_from(data.as_bytes(), TableKind::Stores).unwrap();
        assert_eq!(table.columns[1], "City");
        assert_eq!(table.rows[0], vec!["S1", "Dubai", "App"]);
        assert_eq!(table.rows[1].len(), 2);
        assert_eq!(table.missing_cells(), 1);
    }

    #[test]
    fn test_whole_number_cells_render_without_fraction() {
        assert_eq!(cell_text(&Data::Float(12.0)), "12");
        assert_eq!(cell_text(&Data::Float(12.5)), "12.5");
        assert_eq!(cell_text(&Data::String("  Abu Dhabi ".into())), "Abu Dhabi");
        assert_eq!(cell_text(&Data::Empty), "");
    }
}
