//! Application state owned by the top-level process.
//!
//! Holds the cleaned dataset, its quality report, the generation cache and
//! the activity log. Phases are explicit: load (generate or ingest), then
//! analyse. Nothing here is global.

use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use crate::audit::{ActivityLog, LogCategory};
use crate::cache::{CacheConfig, CacheStats, TableCache};
use crate::clean::{Cleaner, CleaningPolicy, QualityReport};
use crate::error::{Error, Result};
use crate::forecast::{Forecast, ForecastParams, ReorderParams, ReorderSuggestion, forecast, reorder_plan};
use crate::generator::{GeneratedData, GeneratorConfig, generate};
use crate::metrics::{Kpis, SegmentFilter, compute_kpis, filter_dataset};
use crate::model::{Dataset, RawDataset};
use crate::schema::TableKind;
use crate::simulate::{PromotionOutcome, PromotionParams, simulate_segment};

/// A table that could not be cleaned; the other tables are unaffected.
#[derive(Debug)]
pub struct TableFailure {
    pub table: TableKind,
    pub error: Error,
}

pub struct AppState {
    cleaner: Cleaner,
    generated: TableCache<GeneratedData>,
    log: ActivityLog,
    dataset: Dataset,
    quality: QualityReport,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(CleaningPolicy::default(), CacheConfig::default())
    }
}

impl AppState {
    pub fn new(policy: CleaningPolicy, cache: CacheConfig) -> Self {
        Self {
            cleaner: Cleaner::new(policy),
            generated: TableCache::new(cache),
            log: ActivityLog::default(),
            dataset: Dataset::default(),
            quality: QualityReport::default(),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn quality(&self) -> &QualityReport {
        &self.quality
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut ActivityLog {
        &mut self.log
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.generated.stats()
    }

    /// Generate (or reuse) synthetic tables for `config` and clean them.
    ///
    /// Returns the raw generator output, which still carries its defects.
    pub fn generate(&mut self, config: &GeneratorConfig) -> Result<Arc<GeneratedData>> {
        let key = config.cache_key()?;
        let data = match self.generated.get_or_try_insert_with(&key, || generate(config)) {
            Ok(data) => data,
            Err(error) => {
                self.log.error(
                    LogCategory::DataInput,
                    "synthetic data generation failed",
                    json!({ "error": error.to_string() }),
                );
                return Err(error);
            }
        };
        self.log.info(
            LogCategory::DataInput,
            "generated synthetic dataset",
            json!({
                "seed": config.seed,
                "sales": data.sales.len(),
                "products": data.products.len(),
                "stores": data.stores.len(),
            }),
        );

        let failures = self.ingest(&data.to_raw_dataset());
        match failures.into_iter().next() {
            Some(failure) => Err(failure.error),
            None => Ok(data),
        }
    }

    /// Clean every table in `raw`, replacing the matching tables in the state.
    ///
    /// Tables are independent: a table that fails keeps its previous
    /// contents and is reported back, the rest are still loaded.
    pub fn ingest(&mut self, raw: &RawDataset) -> Vec<TableFailure> {
        let mut failures = Vec::new();
        for table in raw.tables() {
            match self.cleaner.clean_into(table, &mut self.dataset) {
                Ok(report) => {
                    self.log.record_cleaning(&report);
                    self.quality.upsert(report);
                }
                Err(error) => {
                    warn!(table = %table.kind, %error, "table rejected");
                    self.log.error(
                        LogCategory::DataInput,
                        format!("failed to load {}", table.kind),
                        json!({ "error": error.to_string() }),
                    );
                    failures.push(TableFailure {
                        table: table.kind,
                        error,
                    });
                }
            }
        }
        failures
    }

    pub fn kpis(&mut self, filter: &SegmentFilter) -> Kpis {
        let kpis = compute_kpis(&self.dataset, filter);
        self.log.info(
            LogCategory::Analysis,
            "computed KPIs",
            json!({ "segment": filter.to_string(), "orders": kpis.total_orders }),
        );
        kpis
    }

    pub fn simulate(&mut self, filter: &SegmentFilter, params: &PromotionParams) -> Result<PromotionOutcome> {
        let outcome = simulate_segment(&self.dataset, filter, params)?;
        self.log.info(
            LogCategory::Analysis,
            "simulated promotion",
            json!({
                "segment": filter.to_string(),
                "params": params,
                "incremental_revenue": outcome.incremental_revenue,
                "roi_pct": outcome.roi_pct,
            }),
        );
        Ok(outcome)
    }

    pub fn reorder(&mut self, filter: &SegmentFilter, params: &ReorderParams) -> Vec<ReorderSuggestion> {
        let plan = reorder_plan(&self.dataset, filter, params);
        self.log.info(
            LogCategory::Analysis,
            "computed reorder plan",
            json!({
                "segment": filter.to_string(),
                "needs_reorder": plan.iter().filter(|s| s.needs_reorder).count(),
            }),
        );
        plan
    }

    pub fn forecast(&mut self, filter: &SegmentFilter, params: &ForecastParams) -> Result<Forecast> {
        let result = forecast(&self.dataset, filter, params)?;
        self.log.info(
            LogCategory::Analysis,
            "computed demand forecast",
            json!({
                "segment": filter.to_string(),
                "metric": params.metric,
                "trend_factor": result.trend_factor,
            }),
        );
        Ok(result)
    }

    /// The dataset restricted to a segment, for export.
    pub fn filtered(&self, filter: &SegmentFilter) -> Dataset {
        filter_dataset(&self.dataset, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawTable;

    fn small() -> GeneratorConfig {
        GeneratorConfig {
            num_sales: 500,
            num_products: 20,
            num_stores: 5,
            num_campaigns: 4,
            days_of_data: 30,
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn test_generate_is_memoized() {
        let mut state = AppState::default();
        let first = state.generate(&small()).unwrap();
        let second = state.generate(&small()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(state.cache_stats().hits, 1);
        assert_eq!(state.quality().tables.len(), 5);
        assert!(!state.dataset().sales.is_empty());
    }

    #[test]
    fn test_ingest_keeps_good_tables_when_one_fails() {
        let mut state = AppState::default();
        let data = generate(&small()).unwrap();
        let mut raw = data.to_raw_dataset();
        raw.insert(RawTable::new(TableKind::Stores, vec!["store_id".to_string()]));

        let failures = state.ingest(&raw);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].table, TableKind::Stores);
        assert!(state.dataset().stores.is_empty());
        assert!(!state.dataset().sales.is_empty());
        assert!(state.quality().get(TableKind::Stores).is_none());
        assert_eq!(state.log().counts_by_level()[&crate::audit::LogLevel::Error], 1);
    }

    #[test]
    fn test_invalid_generation_is_logged() {
        let mut state = AppState::default();
        let config = GeneratorConfig {
            num_stores: 0,
            ..small()
        };
        assert!(state.generate(&config).is_err());
        assert!(state.dataset().is_empty());
        assert_eq!(state.log().len(), 1);
    }
}
