//! Integration tests for table loading and export.
//!
//! Tests the full pipeline: generated tables → CSV files → load → clean → export → reload.

use std::fs;
use std::path::Path;

use souq_core::{Cleaner, Dataset, GeneratorConfig, TableKind, generate};
use souq_io::{
    DataError, ExportFormat, export_dataset, export_table, find_table_file, load_dir, load_table,
    write_csv,
};
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

/// Create a temporary directory for test artifacts.
fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

fn small_config() -> GeneratorConfig {
    GeneratorConfig {
        num_sales: 400,
        num_products: 15,
        num_stores: 4,
        num_campaigns: 3,
        days_of_data: 30,
        ..GeneratorConfig::default()
    }
}

/// Write the generator's raw tables into `dir` as `<table>.csv`.
fn write_generated(dir: &Path) {
    let raw = generate(&small_config()).unwrap().to_raw_dataset();
    for table in raw.tables() {
        write_csv(dir.join(format!("{}.csv", table.kind)), table).unwrap();
    }
}

fn clean(dir: &Path) -> Dataset {
    let outcome = load_dir(dir).unwrap();
    assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);
    Cleaner::default().clean_dataset(&outcome.raw).unwrap().0
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_load_dir_reads_every_table() {
    let dir = temp_dir();
    write_generated(dir.path());

    let outcome = load_dir(dir.path()).unwrap();
    assert_eq!(outcome.loaded(), 5);
    assert!(outcome.missing.is_empty());
    assert_eq!(outcome.raw.get(TableKind::Sales).unwrap().len(), 403);
}

#[test]
fn test_one_bad_table_does_not_block_the_others() {
    let dir = temp_dir();
    write_generated(dir.path());
    fs::write(dir.path().join("stores.csv"), "store_id,region\nS001,Gulf\n").unwrap();

    let outcome = load_dir(dir.path()).unwrap();
    assert_eq!(outcome.loaded(), 4);
    assert_eq!(outcome.failures.len(), 1);
    let failure = &outcome.failures[0];
    assert_eq!(failure.table, TableKind::Stores);
    assert!(matches!(failure.error, DataError::Schema(_)));
    assert!(failure.error.to_string().contains("city"));
}

#[test]
fn test_absent_tables_are_listed_as_missing() {
    let dir = temp_dir();
    fs::write(
        dir.path().join("sales.csv"),
        "order_id,order_time,product_id,store_id,qty,selling_price\nO1,2025-01-01 10:00:00,P1,S1,1,10\n",
    )
    .unwrap();

    let outcome = load_dir(dir.path()).unwrap();
    assert_eq!(outcome.loaded(), 1);
    assert_eq!(outcome.missing.len(), 4);
    assert!(!outcome.missing.contains(&TableKind::Sales));
}

#[test]
fn test_aliased_headers_and_file_casing() {
    let dir = temp_dir();
    fs::write(
        dir.path().join("Sales.CSV"),
        "Order ID,Date,Product ID,Store ID,Quantity,Unit Price,Discount\n\
         O1,2025-03-01 09:30:00,P1,S1,2,50,\n\
         O2,not a date,P2,S1,,20,10\n",
    )
    .unwrap();

    let path = find_table_file(dir.path(), TableKind::Sales).unwrap().unwrap();
    let table = load_table(&path, TableKind::Sales).unwrap();
    let sales = Cleaner::default().clean_sales(&table).unwrap().records;

    assert_eq!(sales.len(), 2);
    assert_eq!(sales[0].revenue, 100.0);
    assert_eq!(sales[0].discount_pct, 0.0);
    assert!(sales[1].order_time.is_none());
    assert_eq!(sales[1].qty, 1);
}

#[test]
fn test_unsupported_extension_is_rejected() {
    let dir = temp_dir();
    let path = dir.path().join("sales.txt");
    fs::write(&path, "order_id\nO1\n").unwrap();
    assert!(matches!(
        load_table(&path, TableKind::Sales),
        Err(DataError::UnsupportedFormat(_))
    ));
    assert!(find_table_file(dir.path(), TableKind::Sales).unwrap().is_none());
}

// =============================================================================
// Export
// =============================================================================

#[test]
fn test_exported_csv_cleans_to_the_same_dataset() {
    let input = temp_dir();
    write_generated(input.path());
    let once = clean(input.path());

    let output = temp_dir();
    let written = export_dataset(&once, output.path(), ExportFormat::Csv).unwrap();
    assert_eq!(written.len(), 5);

    let twice = clean(output.path());
    assert_eq!(once, twice);
}

#[test]
fn test_json_export_writes_typed_records() {
    let input = temp_dir();
    write_generated(input.path());
    let dataset = clean(input.path());

    let out = temp_dir();
    let path = out.path().join("nested").join("inventory.json");
    let rows = export_table(&dataset, TableKind::Inventory, &path).unwrap();

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let records = value.as_array().unwrap();
    assert_eq!(records.len(), rows);
    assert!(records[0].get("stock_status").is_some());
}
