//! Reorder suggestions and a naive demand forecast.
//!
//! Both work from sales velocity only. The forecast is a trend-adjusted
//! moving average with a fixed ±20% band, not a statistical model.

use std::fmt;

use chrono::{Duration, NaiveDate};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::metrics::{DimensionIndex, SegmentFilter, date_range, filter_sales, latest_inventory, observed_days};
use crate::model::{Category, Dataset, Sale};
use crate::stats::{mean, safe_div};

/// Window compared by the trend factor, in days.
pub const TREND_WINDOW_DAYS: usize = 14;

/// Half-width of the forecast band, as a fraction of the projection.
pub const FORECAST_BAND: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorderParams {
    /// Buffer days of demand held as safety stock.
    pub safety_days: u32,
    /// Days of demand covered by one order cycle.
    pub cycle_days: u32,
}

impl Default for ReorderParams {
    fn default() -> Self {
        Self {
            safety_days: 7,
            cycle_days: 14,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReorderSuggestion {
    pub product_id: String,
    pub category: Option<Category>,
    /// Sum of the latest non-negative stock across the segment's stores.
    pub current_stock: i64,
    /// Longest lead time among those stores.
    pub lead_time_days: i64,
    pub daily_velocity: f64,
    pub safety_stock: f64,
    pub reorder_qty: i64,
    /// `None` when nothing sells.
    pub days_of_cover: Option<f64>,
    /// Stock will not last through lead time plus safety days.
    pub needs_reorder: bool,
}

/// Reorder quantities for every product with a current stock position.
///
/// `reorder_qty = max(0, v × (safety + cycle + lead) − stock)`, rounded up,
/// where `v` is units sold per observed day. Largest quantities first.
pub fn reorder_plan(
    dataset: &Dataset,
    filter: &SegmentFilter,
    params: &ReorderParams,
) -> Vec<ReorderSuggestion> {
    let index = DimensionIndex::new(dataset);
    let sales: Vec<&Sale> = filter_sales(dataset, &index, filter)
        .into_iter()
        .filter(|s| s.order_time.is_some())
        .collect();
    let days = observed_days(sales.iter().copied()) as f64;

    let mut sold: FxHashMap<&str, i64> = FxHashMap::default();
    for sale in &sales {
        *sold.entry(sale.product_id.as_str()).or_default() += sale.qty;
    }

    let mut positions: FxHashMap<&str, (i64, i64)> = FxHashMap::default();
    for row in latest_inventory(&dataset.inventory) {
        if !index.matches_stock(filter, row) {
            continue;
        }
        let entry = positions.entry(row.product_id.as_str()).or_default();
        // Negative on-hand is a recording defect; it contributes no stock.
        entry.0 += row.stock_on_hand.max(0);
        entry.1 = entry.1.max(row.lead_time_days);
    }

    let safety = f64::from(params.safety_days);
    let cycle = f64::from(params.cycle_days);

    let mut plan: Vec<ReorderSuggestion> = positions
        .into_iter()
        .map(|(product_id, (stock, lead_time))| {
            let velocity = safe_div(sold.get(product_id).copied().unwrap_or(0) as f64, days);
            let lead = lead_time as f64;
            let target = velocity * safety + velocity * cycle + velocity * lead;
            let reorder_qty = (target - stock as f64).max(0.0).ceil() as i64;

            ReorderSuggestion {
                product_id: product_id.to_string(),
                category: index.category(product_id),
                current_stock: stock,
                lead_time_days: lead_time,
                daily_velocity: velocity,
                safety_stock: velocity * safety,
                reorder_qty,
                days_of_cover: (velocity > 0.0).then(|| stock as f64 / velocity),
                needs_reorder: (stock as f64) < velocity * (lead + safety),
            }
        })
        .collect();

    plan.sort_by(|a, b| {
        b.reorder_qty
            .cmp(&a.reorder_qty)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    debug!(products = plan.len(), observed_days = days, "computed reorder plan");
    plan
}

/// Quantity being forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastMetric {
    #[default]
    Revenue,
    Units,
    Orders,
}

impl ForecastMetric {
    pub fn name(&self) -> &'static str {
        match self {
            ForecastMetric::Revenue => "revenue",
            ForecastMetric::Units => "units",
            ForecastMetric::Orders => "orders",
        }
    }

    fn value_of(&self, sale: &Sale) -> f64 {
        match self {
            ForecastMetric::Revenue => sale.revenue,
            ForecastMetric::Units => sale.qty as f64,
            ForecastMetric::Orders => 1.0,
        }
    }
}

impl fmt::Display for ForecastMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastParams {
    /// 1–90.
    pub horizon_days: u32,
    pub metric: ForecastMetric,
}

impl Default for ForecastParams {
    fn default() -> Self {
        Self {
            horizon_days: 14,
            metric: ForecastMetric::Revenue,
        }
    }
}

impl ForecastParams {
    pub fn validate(&self) -> Result<()> {
        if !(1..=90).contains(&self.horizon_days) {
            return Err(Error::invalid_parameter("horizon_days", "must be between 1 and 90"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub metric: ForecastMetric,
    /// Days in the zero-filled history.
    pub history_days: usize,
    pub daily_average: f64,
    /// Mean of the last window over the one before it; 1 when history is short.
    pub trend_factor: f64,
    /// Empty when the segment has no dated sales.
    pub points: Vec<ForecastPoint>,
    pub total: f64,
}

/// Project the segment's daily `metric` over the next `horizon_days`.
pub fn forecast(dataset: &Dataset, filter: &SegmentFilter, params: &ForecastParams) -> Result<Forecast> {
    params.validate()?;

    let index = DimensionIndex::new(dataset);
    let sales = filter_sales(dataset, &index, filter);
    let Some((first, last)) = date_range(sales.iter().copied()) else {
        return Ok(Forecast {
            metric: params.metric,
            history_days: 0,
            daily_average: 0.0,
            trend_factor: 1.0,
            points: Vec::new(),
            total: 0.0,
        });
    };

    let span = (last - first).num_days() as usize + 1;
    let mut series = vec![0.0; span];
    for sale in &sales {
        if let Some(date) = sale.order_date() {
            series[(date - first).num_days() as usize] += params.metric.value_of(sale);
        }
    }

    let daily_average = mean(&series);
    let trend_factor = trend_factor(&series);

    let points: Vec<ForecastPoint> = (1..=params.horizon_days)
        .map(|day| {
            let value = daily_average * trend_factor.powf(f64::from(day) / TREND_WINDOW_DAYS as f64);
            ForecastPoint {
                date: last + Duration::days(i64::from(day)),
                value,
                lower: value * (1.0 - FORECAST_BAND),
                upper: value * (1.0 + FORECAST_BAND),
            }
        })
        .collect();

    Ok(Forecast {
        metric: params.metric,
        history_days: span,
        daily_average,
        trend_factor,
        total: points.iter().map(|p| p.value).sum(),
        points,
    })
}

fn trend_factor(series: &[f64]) -> f64 {
    if series.len() < 2 * TREND_WINDOW_DAYS {
        return 1.0;
    }
    let split = series.len() - TREND_WINDOW_DAYS;
    let recent = mean(&series[split..]);
    let prior = mean(&series[split - TREND_WINDOW_DAYS..split]);
    if prior == 0.0 { 1.0 } else { safe_div(recent, prior) }
}
