//! KPI and aggregation engine.
//!
//! Everything here is a pure function of the cleaned [`Dataset`] and a
//! [`SegmentFilter`]. Ratios over empty selections come back as `0.0`.

mod breakdown;
mod filter;

pub use breakdown::{
    CampaignTimelineEntry, DailyPoint, Dimension, GroupTotal, HourBucket, StatusCount,
    StockTrendPoint, StorePerformance, TimePatterns, WeekdayBucket, campaign_timeline,
    daily_trend, revenue_by, stock_status_counts, stock_trend, store_performance, time_patterns,
};
pub use filter::{DimensionIndex, SegmentFilter, filter_dataset, filter_sales};

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::model::{Dataset, InventorySnapshot, Sale, StockStatus};
use crate::stats::{mean, pct, safe_div};

/// Headline metrics for a segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Kpis {
    pub total_revenue: f64,
    pub total_orders: usize,
    pub total_units: i64,
    pub avg_order_value: f64,
    pub avg_discount_pct: f64,
    pub return_rate_pct: f64,
    /// Revenue minus `qty × unit_cost` for sales whose product is known.
    pub gross_margin: f64,
    pub gross_margin_pct: f64,
    pub unique_products: usize,
    pub unique_stores: usize,
    pub outlier_orders: usize,
    /// Orders without a usable timestamp.
    pub undated_orders: usize,
    pub observed_days: i64,
    pub avg_daily_revenue: f64,

    /// Latest snapshot per product/store pair.
    pub stock_positions: usize,
    pub total_stock: i64,
    pub critical_stock: usize,
    pub low_stock: usize,
    pub healthy_stock: usize,
    pub stock_health_pct: f64,

    pub total_campaigns: usize,
    pub active_campaigns: usize,
    pub campaign_budget: f64,
    pub avg_campaign_discount_pct: f64,
}

impl Kpis {
    /// Flat name → value view, for tabular output.
    pub fn metric_map(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("total_revenue", self.total_revenue),
            ("total_orders", self.total_orders as f64),
            ("total_units", self.total_units as f64),
            ("avg_order_value", self.avg_order_value),
            ("avg_discount_pct", self.avg_discount_pct),
            ("return_rate_pct", self.return_rate_pct),
            ("gross_margin", self.gross_margin),
            ("gross_margin_pct", self.gross_margin_pct),
            ("unique_products", self.unique_products as f64),
            ("unique_stores", self.unique_stores as f64),
            ("outlier_orders", self.outlier_orders as f64),
            ("undated_orders", self.undated_orders as f64),
            ("observed_days", self.observed_days as f64),
            ("avg_daily_revenue", self.avg_daily_revenue),
            ("stock_positions", self.stock_positions as f64),
            ("total_stock", self.total_stock as f64),
            ("critical_stock", self.critical_stock as f64),
            ("low_stock", self.low_stock as f64),
            ("healthy_stock", self.healthy_stock as f64),
            ("stock_health_pct", self.stock_health_pct),
            ("total_campaigns", self.total_campaigns as f64),
            ("active_campaigns", self.active_campaigns as f64),
            ("campaign_budget", self.campaign_budget),
            ("avg_campaign_discount_pct", self.avg_campaign_discount_pct),
        ])
    }
}

/// Compute headline metrics for the segment selected by `filter`.
pub fn compute_kpis(dataset: &Dataset, filter: &SegmentFilter) -> Kpis {
    let index = DimensionIndex::new(dataset);
    let sales = filter_sales(dataset, &index, filter);

    let total_revenue: f64 = sales.iter().map(|s| s.revenue).sum();
    let total_orders = sales
        .iter()
        .map(|s| s.order_id.as_str())
        .collect::<FxHashSet<_>>()
        .len();
    let total_units: i64 = sales.iter().map(|s| s.qty).sum();
    let discounts: Vec<f64> = sales.iter().map(|s| s.discount_pct).collect();
    let returns = sales.iter().filter(|s| s.return_flag).count();

    let cost: f64 = sales
        .iter()
        .filter_map(|s| index.product(&s.product_id).map(|p| s.qty as f64 * p.unit_cost))
        .sum();
    let costed_revenue: f64 = sales
        .iter()
        .filter(|s| index.product(&s.product_id).is_some())
        .map(|s| s.revenue)
        .sum();
    let gross_margin = costed_revenue - cost;

    let observed_days = observed_days(sales.iter().copied());

    let stock: Vec<&InventorySnapshot> = latest_inventory(&dataset.inventory)
        .into_iter()
        .filter(|row| index.matches_stock(filter, row))
        .collect();
    let status_count = |status: StockStatus| stock.iter().filter(|r| r.stock_status == status).count();
    let healthy_stock = status_count(StockStatus::Healthy);

    let campaigns: Vec<_> = dataset
        .campaigns
        .iter()
        .filter(|c| filter.overlaps_campaign(c))
        .collect();
    let campaign_discounts: Vec<f64> = campaigns.iter().map(|c| c.discount_pct).collect();

    Kpis {
        total_revenue,
        total_orders,
        total_units,
        avg_order_value: safe_div(total_revenue, total_orders as f64),
        avg_discount_pct: mean(&discounts),
        return_rate_pct: pct(returns as f64, sales.len() as f64),
        gross_margin,
        gross_margin_pct: pct(gross_margin, costed_revenue),
        unique_products: sales
            .iter()
            .map(|s| s.product_id.as_str())
            .collect::<FxHashSet<_>>()
            .len(),
        unique_stores: sales
            .iter()
            .map(|s| s.store_id.as_str())
            .collect::<FxHashSet<_>>()
            .len(),
        outlier_orders: sales.iter().filter(|s| s.is_outlier).count(),
        undated_orders: sales.iter().filter(|s| s.order_time.is_none()).count(),
        observed_days,
        avg_daily_revenue: safe_div(total_revenue, observed_days as f64),

        stock_positions: stock.len(),
        total_stock: stock.iter().map(|r| r.stock_on_hand).sum(),
        critical_stock: status_count(StockStatus::Critical),
        low_stock: status_count(StockStatus::Low),
        healthy_stock,
        stock_health_pct: pct(healthy_stock as f64, stock.len() as f64),

        total_campaigns: campaigns.len(),
        active_campaigns: campaigns.iter().filter(|c| c.is_active).count(),
        campaign_budget: campaigns.iter().map(|c| c.promo_budget).sum(),
        avg_campaign_discount_pct: mean(&campaign_discounts),
    }
}

/// Latest dated snapshot for each (product, store) pair, ordered by key.
///
/// Undated snapshots never count as current.
pub fn latest_inventory(rows: &[InventorySnapshot]) -> Vec<&InventorySnapshot> {
    let mut latest: FxHashMap<(&str, &str), &InventorySnapshot> = FxHashMap::default();
    for row in rows {
        let Some(date) = row.snapshot_date else {
            continue;
        };
        let key = (row.product_id.as_str(), row.store_id.as_str());
        let newer = latest
            .get(&key)
            .and_then(|current| current.snapshot_date)
            .is_none_or(|current| date > current);
        if newer {
            latest.insert(key, row);
        }
    }
    let mut current: Vec<&InventorySnapshot> = latest.into_values().collect();
    current.sort_by(|a, b| (&a.product_id, &a.store_id).cmp(&(&b.product_id, &b.store_id)));
    current
}

/// First and last order date among dated sales.
pub fn date_range<'a>(sales: impl IntoIterator<Item = &'a Sale>) -> Option<(NaiveDate, NaiveDate)> {
    sales
        .into_iter()
        .filter_map(Sale::order_date)
        .fold(None, |range, date| match range {
            None => Some((date, date)),
            Some((first, last)) => Some((first.min(date), last.max(date))),
        })
}

/// Whole days between the first and last dated sale, never less than 1.
pub fn observed_days<'a>(sales: impl IntoIterator<Item = &'a Sale>) -> i64 {
    date_range(sales)
        .map(|(first, last)| (last - first).num_days())
        .unwrap_or(0)
        .max(1)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{
        Campaign, Category, Channel, City, LaunchFlag, PaymentStatus, Product, Scope, Store,
    };
    use chrono::NaiveDateTime;

    pub(crate) fn ts(raw: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").ok()
    }

    pub(crate) fn date(raw: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
    }

    pub(crate) fn sale(id: &str, time: &str, product: &str, store: &str, qty: i64, price: f64) -> Sale {
        Sale {
            order_id: id.to_string(),
            order_time: ts(time),
            product_id: product.to_string(),
            store_id: store.to_string(),
            qty,
            selling_price: price,
            discount_pct: 10.0,
            payment_status: PaymentStatus::Paid,
            return_flag: false,
            revenue: qty as f64 * price,
            is_outlier: false,
        }
    }

    pub(crate) fn stock(date_raw: &str, product: &str, store: &str, on_hand: i64) -> InventorySnapshot {
        InventorySnapshot {
            snapshot_date: date(date_raw),
            product_id: product.to_string(),
            store_id: store.to_string(),
            stock_on_hand: on_hand,
            reorder_point: 20,
            lead_time_days: 5,
            stock_status: StockStatus::classify(on_hand, 20),
            is_anomaly: on_hand < 0,
        }
    }

    /// Two products, two stores, a handful of sales over five days.
    pub(crate) fn fixture() -> Dataset {
        let product = |id: &str, category, cost| Product {
            product_id: id.to_string(),
            category,
            brand: "Acme".to_string(),
            base_price: 100.0,
            unit_cost: cost,
            tax_rate: 0.05,
            launch_flag: LaunchFlag::Regular,
        };
        let store = |id: &str, city, channel| Store {
            store_id: id.to_string(),
            city: city_label(city),
            city_clean: city,
            channel,
            fulfillment_type: "Own Fleet".to_string(),
        };

        Dataset {
            products: vec![
                product("P1", Category::Beauty, 40.0),
                product("P2", Category::Sports, 60.0),
            ],
            stores: vec![
                store("S1", City::Dubai, Channel::App),
                store("S2", City::Sharjah, Channel::Web),
            ],
            sales: vec![
                sale("O1", "2025-06-01 09:15:00", "P1", "S1", 2, 100.0),
                sale("O2", "2025-06-01 18:40:00", "P2", "S2", 1, 80.0),
                sale("O3", "2025-06-03 09:05:00", "P1", "S2", 3, 50.0),
                sale("O4", "2025-06-06 12:00:00", "P2", "S1", 4, 25.0),
                sale("O5", "garbage", "P1", "S1", 1, 20.0),
            ],
            inventory: vec![
                stock("2025-06-23", "P1", "S1", 5),
                stock("2025-06-30", "P1", "S1", 100),
                stock("2025-06-30", "P2", "S1", -3),
                stock("2025-06-30", "P1", "S2", 15),
            ],
            campaigns: vec![Campaign {
                campaign_id: "C1".to_string(),
                start_date: date("2025-06-25"),
                end_date: date("2025-07-05"),
                duration_days: Some(10),
                is_active: true,
                city: Scope::Only(City::Dubai),
                channel: Scope::All,
                category: Scope::All,
                discount_pct: 20.0,
                promo_budget: 5000.0,
            }],
        }
    }

    fn city_label(city: City) -> String {
        match city {
            City::Dubai => "DXB".to_string(),
            other => other.to_string(),
        }
    }

    #[test]
    fn test_kpis_over_everything() {
        let kpis = compute_kpis(&fixture(), &SegmentFilter::default());

        assert_eq!(kpis.total_revenue, 200.0 + 80.0 + 150.0 + 100.0 + 20.0);
        assert_eq!(kpis.total_orders, 5);
        assert_eq!(kpis.total_units, 11);
        assert_eq!(kpis.avg_order_value, 110.0);
        assert_eq!(kpis.undated_orders, 1);
        // 2025-06-01 .. 2025-06-06
        assert_eq!(kpis.observed_days, 5);

        assert_eq!(kpis.stock_positions, 3);
        assert_eq!(kpis.critical_stock, 1);
        assert_eq!(kpis.low_stock, 1);
        assert_eq!(kpis.healthy_stock, 1);
        assert_eq!(kpis.total_stock, 112);
        assert_eq!(kpis.active_campaigns, 1);
    }

    #[test]
    fn test_kpis_respect_segment() {
        let filter = SegmentFilter {
            city: Scope::Only(City::Sharjah),
            ..SegmentFilter::default()
        };
        let kpis = compute_kpis(&fixture(), &filter);
        assert_eq!(kpis.total_revenue, 230.0);
        assert_eq!(kpis.total_orders, 2);
        assert_eq!(kpis.stock_positions, 1);
        assert_eq!(kpis.total_campaigns, 0);
        assert_eq!(kpis.gross_margin, 230.0 - (1.0 * 60.0 + 3.0 * 40.0));
    }

    #[test]
    fn test_empty_selection_yields_zeros() {
        let filter = SegmentFilter {
            category: Scope::Only(Category::Grocery),
            ..SegmentFilter::default()
        };
        let kpis = compute_kpis(&fixture(), &filter);
        assert_eq!(kpis.total_orders, 0);
        assert_eq!(kpis.avg_order_value, 0.0);
        assert_eq!(kpis.return_rate_pct, 0.0);
        assert_eq!(kpis.stock_health_pct, 0.0);
        assert_eq!(kpis.observed_days, 1);
        assert!(kpis.metric_map().values().all(|v| v.is_finite()));

        let empty = compute_kpis(&Dataset::default(), &SegmentFilter::default());
        assert_eq!(empty, Kpis { observed_days: 1, ..Kpis::default() });
    }

    #[test]
    fn test_latest_inventory_per_pair() {
        let dataset = fixture();
        let latest = latest_inventory(&dataset.inventory);
        assert_eq!(latest.len(), 3);
        let p1s1 = latest
            .iter()
            .find(|r| r.product_id == "P1" && r.store_id == "S1")
            .unwrap();
        assert_eq!(p1s1.stock_on_hand, 100);
    }
}
