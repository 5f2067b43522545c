//! End-to-end tests for souq CLI commands.
//!
//! These tests run the binary against small generated datasets written to
//! temporary directories.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin for tests

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

const SMALL: [&str; 10] = [
    "--sales",
    "300",
    "--products",
    "10",
    "--stores",
    "4",
    "--campaigns",
    "3",
    "--days",
    "30",
];

/// A scratch directory with an empty config file, so the user's own config
/// never leaks into a test.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(dir.path().join("config.json"), "{}").expect("Failed to write config");
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn data_dir(&self) -> PathBuf {
        self.path().join("data")
    }

    fn souq(&self) -> Command {
        let mut cmd = Command::cargo_bin("souq").expect("Failed to find souq binary");
        cmd.arg("--config").arg(self.path().join("config.json"));
        cmd
    }

    /// Generate a small raw dataset into `data/`.
    fn generate(&self) -> &Self {
        self.souq()
            .arg("generate")
            .args(SMALL)
            .arg("--output")
            .arg(self.data_dir())
            .assert()
            .success();
        self
    }

    fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self
            .souq()
            .args(args)
            .arg("--data")
            .arg(self.data_dir())
            .arg("--json")
            .output()
            .expect("Failed to run souq");
        assert!(
            output.status.success(),
            "souq {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
    }
}

// =============================================================================
// Data commands
// =============================================================================

#[test]
fn test_generate_writes_five_tables() {
    let ws = Workspace::new();
    ws.souq()
        .arg("generate")
        .args(SMALL)
        .arg("--output")
        .arg(ws.data_dir())
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated dataset"));

    for table in ["products", "stores", "sales", "inventory", "campaigns"] {
        assert!(ws.data_dir().join(format!("{table}.csv")).is_file(), "{table}.csv missing");
    }
    let sales = fs::read_to_string(ws.data_dir().join("sales.csv")).unwrap();
    assert!(sales.starts_with("order_id,order_time,product_id,store_id,qty,selling_price"));
}

#[test]
fn test_quality_report_covers_every_table() {
    let ws = Workspace::new();
    ws.generate();

    let report = ws.json(&["quality"]);
    let tables = report["tables"].as_array().unwrap();
    assert_eq!(tables.len(), 5);

    let sales = tables.iter().find(|t| t["table"] == "sales").unwrap();
    assert_eq!(sales["input_rows"], 302);
    assert_eq!(sales["output_rows"], 300);
    assert_eq!(sales["duplicates_removed"], 2);
}

#[test]
fn test_clean_writes_tables_and_report() {
    let ws = Workspace::new();
    ws.generate();
    let out = ws.path().join("clean");

    ws.souq()
        .arg("clean")
        .arg("--data")
        .arg(ws.data_dir())
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Data quality"));

    assert!(out.join("quality.json").is_file());
    let stores = fs::read_to_string(out.join("stores.csv")).unwrap();
    assert!(stores.lines().next().unwrap().contains("city_clean"));
}

#[test]
fn test_missing_data_dir_fails() {
    let ws = Workspace::new();
    ws.souq()
        .arg("kpis")
        .arg("--data")
        .arg(ws.path().join("nowhere"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("nowhere"));
}

#[test]
fn test_bad_table_is_reported_and_others_load() {
    let ws = Workspace::new();
    ws.generate();
    fs::write(ws.data_dir().join("stores.csv"), "store_id,region\nS001,Gulf\n").unwrap();

    ws.souq()
        .arg("kpis")
        .arg("--data")
        .arg(ws.data_dir())
        .arg("--json")
        .assert()
        .success()
        .stderr(predicate::str::contains("stores"));
}

// =============================================================================
// Analysis commands
// =============================================================================

#[test]
fn test_kpis_json() {
    let ws = Workspace::new();
    ws.generate();

    let kpis = ws.json(&["kpis"]);
    assert_eq!(kpis["total_orders"], 300);
    assert!(kpis["total_revenue"].as_f64().unwrap() > 0.0);

    let dubai = ws.json(&["kpis", "--city", "DXB"]);
    assert!(dubai["total_orders"].as_u64().unwrap() <= 300);
}

#[test]
fn test_breakdown_by_category() {
    let ws = Workspace::new();
    ws.generate();

    let groups = ws.json(&["breakdown", "category"]);
    let groups = groups.as_array().unwrap();
    assert!(!groups.is_empty() && groups.len() <= 6);
    let share: f64 = groups.iter().map(|g| g["share_pct"].as_f64().unwrap()).sum();
    assert!((share - 100.0).abs() < 0.5);
}

#[test]
fn test_simulate_and_forecast_json() {
    let ws = Workspace::new();
    ws.generate();

    let outcome = ws.json(&["simulate", "--discount", "20", "--duration", "7", "--lift", "1.5"]);
    assert!(outcome["incremental_revenue"].is_number());
    assert_eq!(outcome["params"]["duration_days"], 7);

    let forecast = ws.json(&["forecast", "--horizon", "7", "--metric", "units"]);
    assert_eq!(forecast["points"].as_array().unwrap().len(), 7);
    assert_eq!(forecast["metric"], "units");

    let plan = ws.json(&["reorder"]);
    assert!(plan.is_array());
}

#[test]
fn test_out_of_range_discount_shows_hint() {
    let ws = Workspace::new();
    ws.souq()
        .args(["simulate", "--discount", "80"])
        .args(SMALL)
        .assert()
        .failure()
        .stderr(predicate::str::contains("discount_pct"))
        .stderr(predicate::str::contains("hint:"));
}

#[test]
fn test_unknown_city_is_rejected() {
    let ws = Workspace::new();
    ws.souq()
        .args(["kpis", "--city", "Paris"])
        .args(SMALL)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown city"));
}

// =============================================================================
// Export and activity log
// =============================================================================

#[test]
fn test_export_single_table_as_json() {
    let ws = Workspace::new();
    ws.generate();
    let out = ws.path().join("export").join("sales.json");

    ws.souq()
        .arg("export")
        .arg("--data")
        .arg(ws.data_dir())
        .args(["--table", "sales", "--channel", "App", "--output"])
        .arg(&out)
        .assert()
        .success();

    let records: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let records = records.as_array().unwrap();
    assert!(records.len() <= 300);
    assert!(records.iter().all(|r| r.get("order_id").is_some()));
}

#[test]
fn test_log_out_writes_activity_csv() {
    let ws = Workspace::new();
    ws.generate();
    let log = ws.path().join("activity.csv");

    ws.souq()
        .arg("--log-out")
        .arg(&log)
        .arg("kpis")
        .arg("--data")
        .arg(ws.data_dir())
        .assert()
        .success();

    let text = fs::read_to_string(&log).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("timestamp,level,category,message,details"));
    assert!(text.contains("DATA_CLEANING"));
    assert!(text.contains("computed KPIs"));
}
