//! Clean, typed records produced by the cleaner.
//!
//! Each record writes back out with its derived columns, so an exported
//! table can be re-ingested and cleaned again without changing.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::enums::{Category, Channel, City, LaunchFlag, PaymentStatus, Scope, StockStatus};
use super::raw::{RawDataset, RawTable, TableRecord, fmt_date, fmt_f64, fmt_timestamp, to_raw_table};
use crate::schema::TableKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub product_id: String,
    pub category: Category,
    pub brand: String,
    pub base_price: f64,
    pub unit_cost: f64,
    pub tax_rate: f64,
    pub launch_flag: LaunchFlag,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Store {
    pub store_id: String,
    /// Spelling as observed in the input.
    pub city: String,
    pub city_clean: City,
    pub channel: Channel,
    pub fulfillment_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sale {
    pub order_id: String,
    /// `None` when the input could not be parsed; such rows are left out of
    /// time-based aggregates only.
    pub order_time: Option<NaiveDateTime>,
    pub product_id: String,
    pub store_id: String,
    pub qty: i64,
    pub selling_price: f64,
    pub discount_pct: f64,
    pub payment_status: PaymentStatus,
    pub return_flag: bool,
    /// `qty × selling_price`.
    pub revenue: f64,
    pub is_outlier: bool,
}

impl Sale {
    pub fn order_date(&self) -> Option<NaiveDate> {
        self.order_time.map(|t| t.date())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventorySnapshot {
    pub snapshot_date: Option<NaiveDate>,
    pub product_id: String,
    pub store_id: String,
    pub stock_on_hand: i64,
    pub reorder_point: i64,
    pub lead_time_days: i64,
    pub stock_status: StockStatus,
    /// Negative or implausibly large stock.
    pub is_anomaly: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Campaign {
    pub campaign_id: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub duration_days: Option<i64>,
    pub is_active: bool,
    pub city: Scope<City>,
    pub channel: Scope<Channel>,
    pub category: Scope<Category>,
    pub discount_pct: f64,
    pub promo_budget: f64,
}

/// The five cleaned tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub products: Vec<Product>,
    pub stores: Vec<Store>,
    pub sales: Vec<Sale>,
    pub inventory: Vec<InventorySnapshot>,
    pub campaigns: Vec<Campaign>,
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
            && self.stores.is_empty()
            && self.sales.is_empty()
            && self.inventory.is_empty()
            && self.campaigns.is_empty()
    }

    /// Row count of one table.
    pub fn len_of(&self, kind: TableKind) -> usize {
        match kind {
            TableKind::Products => self.products.len(),
            TableKind::Stores => self.stores.len(),
            TableKind::Sales => self.sales.len(),
            TableKind::Inventory => self.inventory.len(),
            TableKind::Campaigns => self.campaigns.len(),
        }
    }

    /// One table written back out with its derived columns.
    pub fn to_raw_table(&self, kind: TableKind) -> RawTable {
        match kind {
            TableKind::Products => to_raw_table(&self.products),
            TableKind::Stores => to_raw_table(&self.stores),
            TableKind::Sales => to_raw_table(&self.sales),
            TableKind::Inventory => to_raw_table(&self.inventory),
            TableKind::Campaigns => to_raw_table(&self.campaigns),
        }
    }

    pub fn to_raw_dataset(&self) -> RawDataset {
        let mut raw = RawDataset::default();
        for kind in TableKind::ALL {
            raw.insert(self.to_raw_table(kind));
        }
        raw
    }
}

impl TableRecord for Product {
    const KIND: TableKind = TableKind::Products;

    fn columns() -> &'static [&'static str] {
        &[
            "product_id",
            "category",
            "brand",
            "base_price",
            "unit_cost",
            "tax_rate",
            "launch_flag",
        ]
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.product_id.clone(),
            self.category.to_string(),
            self.brand.clone(),
            fmt_f64(self.base_price),
            fmt_f64(self.unit_cost),
            fmt_f64(self.tax_rate),
            self.launch_flag.to_string(),
        ]
    }
}

impl TableRecord for Store {
    const KIND: TableKind = TableKind::Stores;

    fn columns() -> &'static [&'static str] {
        &["store_id", "city", "city_clean", "channel", "fulfillment_type"]
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.store_id.clone(),
            self.city.clone(),
            self.city_clean.to_string(),
            self.channel.to_string(),
            self.fulfillment_type.clone(),
        ]
    }
}

impl TableRecord for Sale {
    const KIND: TableKind = TableKind::Sales;

    fn columns() -> &'static [&'static str] {
        &[
            "order_id",
            "order_time",
            "product_id",
            "store_id",
            "qty",
            "selling_price",
            "discount_pct",
            "payment_status",
            "return_flag",
            "revenue",
            "is_outlier",
        ]
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.order_id.clone(),
            fmt_timestamp(self.order_time),
            self.product_id.clone(),
            self.store_id.clone(),
            self.qty.to_string(),
            fmt_f64(self.selling_price),
            fmt_f64(self.discount_pct),
            self.payment_status.to_string(),
            self.return_flag.to_string(),
            fmt_f64(self.revenue),
            self.is_outlier.to_string(),
        ]
    }
}

impl TableRecord for InventorySnapshot {
    const KIND: TableKind = TableKind::Inventory;

    fn columns() -> &'static [&'static str] {
        &[
            "snapshot_date",
            "product_id",
            "store_id",
            "stock_on_hand",
            "reorder_point",
            "lead_time_days",
            "stock_status",
            "is_anomaly",
        ]
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            fmt_date(self.snapshot_date),
            self.product_id.clone(),
            self.store_id.clone(),
            self.stock_on_hand.to_string(),
            self.reorder_point.to_string(),
            self.lead_time_days.to_string(),
            self.stock_status.to_string(),
            self.is_anomaly.to_string(),
        ]
    }
}

impl TableRecord for Campaign {
    const KIND: TableKind = TableKind::Campaigns;

    fn columns() -> &'static [&'static str] {
        &[
            "campaign_id",
            "start_date",
            "end_date",
            "duration_days",
            "is_active",
            "city",
            "channel",
            "category",
            "discount_pct",
            "promo_budget",
        ]
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.campaign_id.clone(),
            fmt_date(self.start_date),
            fmt_date(self.end_date),
            self.duration_days.map(|d| d.to_string()).unwrap_or_default(),
            self.is_active.to_string(),
            self.city.to_string(),
            self.channel.to_string(),
            self.category.to_string(),
            fmt_f64(self.discount_pct),
            fmt_f64(self.promo_budget),
        ]
    }
}
