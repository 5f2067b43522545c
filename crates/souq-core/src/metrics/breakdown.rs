//! Grouped views of the cleaned data: the numbers behind each dashboard chart.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate, Timelike, Weekday};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use super::filter::{DimensionIndex, SegmentFilter, filter_sales};
use super::latest_inventory;
use crate::model::{Dataset, StockStatus};
use crate::stats::{pct, safe_div};

/// Grouping key for [`revenue_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Category,
    City,
    Channel,
    Store,
    Product,
}

impl Dimension {
    pub fn name(&self) -> &'static str {
        match self {
            Dimension::Category => "category",
            Dimension::City => "city",
            Dimension::Channel => "channel",
            Dimension::Store => "store",
            Dimension::Product => "product",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub revenue: f64,
    pub orders: usize,
    pub units: i64,
    /// Share of the segment's revenue, in percent.
    pub share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorePerformance {
    pub store_id: String,
    pub city: String,
    pub channel: String,
    pub revenue: f64,
    pub orders: usize,
    pub units: i64,
    pub avg_order_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub revenue: f64,
    pub orders: usize,
    pub units: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourBucket {
    pub hour: u32,
    pub revenue: f64,
    pub orders: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayBucket {
    pub weekday: String,
    pub revenue: f64,
    pub orders: usize,
}

/// Revenue by hour of day (0–23) and by weekday (Monday first).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimePatterns {
    pub hourly: Vec<HourBucket>,
    pub weekday: Vec<WeekdayBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: StockStatus,
    pub positions: usize,
    pub units: i64,
    pub share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockTrendPoint {
    pub date: NaiveDate,
    pub total_stock: i64,
    pub critical: usize,
    pub low: usize,
    pub healthy: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignTimelineEntry {
    pub campaign_id: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub duration_days: Option<i64>,
    pub is_active: bool,
    pub targeting: String,
    pub discount_pct: f64,
    pub promo_budget: f64,
}

#[derive(Default)]
struct Acc<'a> {
    revenue: f64,
    orders: FxHashSet<&'a str>,
    units: i64,
}

impl<'a> Acc<'a> {
    fn add(&mut self, order_id: &'a str, revenue: f64, units: i64) {
        self.revenue += revenue;
        self.orders.insert(order_id);
        self.units += units;
    }
}

/// Revenue, orders and units per value of `dimension`, largest revenue first.
///
/// Sales whose product or store cannot be resolved are grouped under `Unknown`.
pub fn revenue_by(dataset: &Dataset, filter: &SegmentFilter, dimension: Dimension) -> Vec<GroupTotal> {
    let index = DimensionIndex::new(dataset);
    let sales = filter_sales(dataset, &index, filter);
    let total: f64 = sales.iter().map(|s| s.revenue).sum();

    let mut groups: FxHashMap<String, Acc<'_>> = FxHashMap::default();
    for sale in &sales {
        let key = match dimension {
            Dimension::Category => label(index.category(&sale.product_id)),
            Dimension::City => label(index.city(&sale.store_id)),
            Dimension::Channel => label(index.channel(&sale.store_id)),
            Dimension::Store => sale.store_id.clone(),
            Dimension::Product => sale.product_id.clone(),
        };
        groups
            .entry(key)
            .or_default()
            .add(&sale.order_id, sale.revenue, sale.qty);
    }

    let mut totals: Vec<GroupTotal> = groups
        .into_iter()
        .map(|(key, acc)| GroupTotal {
            key,
            revenue: acc.revenue,
            orders: acc.orders.len(),
            units: acc.units,
            share_pct: pct(acc.revenue, total),
        })
        .collect();
    totals.sort_by(|a, b| b.revenue.total_cmp(&a.revenue).then_with(|| a.key.cmp(&b.key)));
    totals
}

/// Per-store totals, best first. `top = 0` returns every store.
pub fn store_performance(dataset: &Dataset, filter: &SegmentFilter, top: usize) -> Vec<StorePerformance> {
    let index = DimensionIndex::new(dataset);
    let mut rows: Vec<StorePerformance> = revenue_by(dataset, filter, Dimension::Store)
        .into_iter()
        .map(|group| {
            let store = index.store(&group.key);
            StorePerformance {
                city: label(store.map(|s| s.city_clean)),
                channel: label(store.map(|s| s.channel)),
                avg_order_value: safe_div(group.revenue, group.orders as f64),
                revenue: group.revenue,
                orders: group.orders,
                units: group.units,
                store_id: group.key,
            }
        })
        .collect();
    if top > 0 {
        rows.truncate(top);
    }
    rows
}

/// Daily totals over dated sales, oldest first. Days without sales are omitted.
pub fn daily_trend(dataset: &Dataset, filter: &SegmentFilter) -> Vec<DailyPoint> {
    let index = DimensionIndex::new(dataset);
    let mut days: BTreeMap<NaiveDate, Acc<'_>> = BTreeMap::new();
    for sale in filter_sales(dataset, &index, filter) {
        if let Some(date) = sale.order_date() {
            days.entry(date)
                .or_default()
                .add(&sale.order_id, sale.revenue, sale.qty);
        }
    }
    days.into_iter()
        .map(|(date, acc)| DailyPoint {
            date,
            revenue: acc.revenue,
            orders: acc.orders.len(),
            units: acc.units,
        })
        .collect()
}

pub fn time_patterns(dataset: &Dataset, filter: &SegmentFilter) -> TimePatterns {
    let index = DimensionIndex::new(dataset);
    let mut hours: Vec<Acc<'_>> = (0..24).map(|_| Acc::default()).collect();
    let mut weekdays: Vec<Acc<'_>> = (0..7).map(|_| Acc::default()).collect();

    for sale in filter_sales(dataset, &index, filter) {
        let Some(time) = sale.order_time else {
            continue;
        };
        hours[time.hour() as usize].add(&sale.order_id, sale.revenue, sale.qty);
        weekdays[time.weekday().num_days_from_monday() as usize].add(
            &sale.order_id,
            sale.revenue,
            sale.qty,
        );
    }

    let mut weekday = Weekday::Mon;
    let weekday_buckets = weekdays
        .into_iter()
        .map(|acc| {
            let bucket = WeekdayBucket {
                weekday: weekday.to_string(),
                revenue: acc.revenue,
                orders: acc.orders.len(),
            };
            weekday = weekday.succ();
            bucket
        })
        .collect();

    TimePatterns {
        hourly: hours
            .into_iter()
            .zip(0u32..)
            .map(|(acc, hour)| HourBucket {
                hour,
                revenue: acc.revenue,
                orders: acc.orders.len(),
            })
            .collect(),
        weekday: weekday_buckets,
    }
}

/// Current stock positions per status, always listing all three statuses.
pub fn stock_status_counts(dataset: &Dataset, filter: &SegmentFilter) -> Vec<StatusCount> {
    let index = DimensionIndex::new(dataset);
    let current: Vec<_> = latest_inventory(&dataset.inventory)
        .into_iter()
        .filter(|row| index.matches_stock(filter, row))
        .collect();

    [StockStatus::Critical, StockStatus::Low, StockStatus::Healthy]
        .into_iter()
        .map(|status| {
            let rows: Vec<_> = current.iter().filter(|r| r.stock_status == status).collect();
            StatusCount {
                status,
                positions: rows.len(),
                units: rows.iter().map(|r| r.stock_on_hand).sum(),
                share_pct: pct(rows.len() as f64, current.len() as f64),
            }
        })
        .collect()
}

/// Stock totals and status mix per snapshot date, oldest first.
pub fn stock_trend(dataset: &Dataset, filter: &SegmentFilter) -> Vec<StockTrendPoint> {
    let index = DimensionIndex::new(dataset);
    let mut points: BTreeMap<NaiveDate, StockTrendPoint> = BTreeMap::new();

    for row in &dataset.inventory {
        let Some(date) = row.snapshot_date else {
            continue;
        };
        if !index.matches_stock(filter, row) {
            continue;
        }
        let point = points.entry(date).or_insert_with(|| StockTrendPoint {
            date,
            total_stock: 0,
            critical: 0,
            low: 0,
            healthy: 0,
        });
        point.total_stock += row.stock_on_hand;
        match row.stock_status {
            StockStatus::Critical => point.critical += 1,
            StockStatus::Low => point.low += 1,
            StockStatus::Healthy => point.healthy += 1,
        }
    }
    points.into_values().collect()
}

/// Campaigns overlapping the segment, by start date. Undated campaigns sort last.
pub fn campaign_timeline(dataset: &Dataset, filter: &SegmentFilter) -> Vec<CampaignTimelineEntry> {
    let mut entries: Vec<CampaignTimelineEntry> = dataset
        .campaigns
        .iter()
        .filter(|c| filter.overlaps_campaign(c))
        .map(|c| CampaignTimelineEntry {
            campaign_id: c.campaign_id.clone(),
            start_date: c.start_date,
            end_date: c.end_date,
            duration_days: c.duration_days,
            is_active: c.is_active,
            targeting: format!("{} / {} / {}", c.city, c.channel, c.category),
            discount_pct: c.discount_pct,
            promo_budget: c.promo_budget,
        })
        .collect();
    entries.sort_by(|a, b| {
        (a.start_date.is_none(), a.start_date, &a.campaign_id)
            .cmp(&(b.start_date.is_none(), b.start_date, &b.campaign_id))
    });
    entries
}

fn label<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "Unknown".to_string(), |v| v.to_string())
}
