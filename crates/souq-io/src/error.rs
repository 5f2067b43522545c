//! Error types for file ingestion and export.

use std::path::PathBuf;

/// Result type for I/O operations.
pub type DataResult<T> = Result<T, DataError>;

/// Errors that can occur while reading or writing tables.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Failed to read an input file.
    #[error("Failed to read file {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// Failed to write an output file.
    #[error("Failed to write file {path}: {message}")]
    Write { path: PathBuf, message: String },

    /// Malformed CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Failed to serialize JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Workbook could not be opened or a sheet could not be read.
    #[error("Spreadsheet error in {path}: {message}")]
    Spreadsheet { path: PathBuf, message: String },

    /// File extension is not one of the supported formats.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(PathBuf),

    /// The table was read but does not fit its schema.
    #[error(transparent)]
    Schema(#[from] souq_core::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// One-line recovery hint for terminal output, if there is a useful one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            DataError::UnsupportedFormat(_) => Some("supported formats are .csv, .xlsx, .xls and .ods"),
            DataError::Csv(_) => Some("check the file is comma-separated with a single header row"),
            DataError::Schema(inner) => inner.hint(),
            _ => None,
        }
    }
}
