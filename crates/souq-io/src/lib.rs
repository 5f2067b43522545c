//! File ingestion and export for souq.
//!
//! Reads CSV and spreadsheet files into raw tables and writes cleaned tables,
//! reports and the activity log back out as CSV or JSON.
//!
//! # Architecture
//!
//! ```text
//! data/ ──► find_table_file ──► load_table ──► RawDataset ──► souq_core::Cleaner
//!   sales.csv                    (csv/calamine,                      │
//!   stores.xlsx                   header check)                      ▼
//!   ...                                                          Dataset
//!                                                                     │
//! out/ ◄──────────── export_table / export_dataset / write_json ◄────┘
//! ```
//!
//! Every table loads on its own. A malformed file becomes a [`LoadFailure`]
//! and the other tables are still returned.

mod error;
mod reader;
mod writer;

pub use error::{DataError, DataResult};
pub use reader::{
    InputFormat, LoadFailure, LoadOutcome, TABLE_EXTENSIONS, find_table_file, load_dir,
    load_table, read_csv, read_csv_from, read_spreadsheet,
};
pub use writer::{
    ExportFormat, export_dataset, export_table, write_csv, write_json, write_log_csv,
    write_table_csv,
};
