//! Core data pipeline for souq retail analytics.
//!
//! This crate provides:
//! - Typed data model and schema/alias resolution
//! - Deterministic synthetic data generation with injected defects
//! - Cleaning with a per-table data-quality report
//! - KPI and breakdown aggregation over segment filters
//! - Promotion simulation, reorder suggestions and demand forecasting
//! - Generation cache, activity log and explicit application state
//!
//! Data flows one way: generator or loader → cleaner → aggregation →
//! KPIs, simulator, forecast. File I/O lives in `souq-io`.

pub mod audit;
pub mod cache;
pub mod clean;
pub mod error;
pub mod forecast;
pub mod generator;
pub mod metrics;
pub mod model;
pub mod schema;
pub mod simulate;
pub mod state;
pub mod stats;

pub use audit::{ActivityLog, LogCategory, LogEntry, LogLevel};
pub use cache::{CacheConfig, CacheStats, TableCache};
pub use clean::{Cleaned, Cleaner, CleaningPolicy, IssueKind, QualityIssue, QualityReport, TableReport, TableSummary};
pub use error::{Error, Result};
pub use forecast::{
    Forecast, ForecastMetric, ForecastParams, ForecastPoint, ReorderParams, ReorderSuggestion,
    forecast, reorder_plan,
};
pub use generator::{DefectRates, GeneratedData, GeneratorConfig, default_end_date, generate};
pub use metrics::{Dimension, Kpis, SegmentFilter, compute_kpis, filter_dataset};
pub use model::{
    Campaign, Category, Channel, City, Dataset, InventorySnapshot, PaymentStatus, Product,
    RawDataset, RawTable, Sale, Scope, StockStatus, Store, TableRecord, to_raw_table,
};
pub use schema::TableKind;
pub use simulate::{Baseline, PromotionOutcome, PromotionParams, simulate, simulate_segment};
pub use state::{AppState, TableFailure};
