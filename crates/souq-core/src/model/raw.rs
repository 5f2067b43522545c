//! Raw, untyped tables and the generator's defect-carrying records.

use chrono::{NaiveDate, NaiveDateTime};

use super::enums::{Category, Channel, City, LaunchFlag, PaymentStatus, Scope};
use crate::schema::TableKind;

/// Timestamp layout used for every exported `order_time`. Fractional seconds
/// are written only when non-zero.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Date layout used for every exported date column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A table of string cells as read from a file or produced by the generator.
///
/// Empty strings stand for missing values. Rows may be shorter than the
/// header; absent trailing cells read as missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub kind: TableKind,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(kind: TableKind, columns: Vec<String>) -> Self {
        Self {
            kind,
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of blank cells, counting cells missing from short rows.
    pub fn missing_cells(&self) -> usize {
        let width = self.columns.len();
        self.rows
            .iter()
            .map(|row| {
                let present = row.iter().take(width).filter(|c| !c.trim().is_empty()).count();
                width - present
            })
            .sum()
    }

    /// Number of rows that exactly repeat an earlier row.
    pub fn duplicate_rows(&self) -> usize {
        let mut seen = rustc_hash::FxHashSet::default();
        self.rows.iter().filter(|row| !seen.insert(row.as_slice())).count()
    }
}

/// A typed record that can be written out as a row of a [`RawTable`].
pub trait TableRecord {
    const KIND: TableKind;

    /// Header written for this record type.
    fn columns() -> &'static [&'static str];

    /// Cells in the same order as [`TableRecord::columns`].
    fn to_row(&self) -> Vec<String>;
}

/// Build a raw table from typed records.
pub fn to_raw_table<R: TableRecord>(records: &[R]) -> RawTable {
    let mut table = RawTable::new(
        R::KIND,
        R::columns().iter().map(|c| c.to_string()).collect(),
    );
    table.rows = records.iter().map(TableRecord::to_row).collect();
    table
}

/// Up to one raw table per kind. Tables load independently, so any may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDataset {
    pub products: Option<RawTable>,
    pub stores: Option<RawTable>,
    pub sales: Option<RawTable>,
    pub inventory: Option<RawTable>,
    pub campaigns: Option<RawTable>,
}

impl RawDataset {
    pub fn get(&self, kind: TableKind) -> Option<&RawTable> {
        match kind {
            TableKind::Products => self.products.as_ref(),
            TableKind::Stores => self.stores.as_ref(),
            TableKind::Sales => self.sales.as_ref(),
            TableKind::Inventory => self.inventory.as_ref(),
            TableKind::Campaigns => self.campaigns.as_ref(),
        }
    }

    /// Store a table in the slot named by its own kind.
    pub fn insert(&mut self, table: RawTable) {
        let slot = match table.kind {
            TableKind::Products => &mut self.products,
            TableKind::Stores => &mut self.stores,
            TableKind::Sales => &mut self.sales,
            TableKind::Inventory => &mut self.inventory,
            TableKind::Campaigns => &mut self.campaigns,
        };
        *slot = Some(table);
    }

    /// Present tables, in [`TableKind::ALL`] order.
    pub fn tables(&self) -> impl Iterator<Item = &RawTable> {
        TableKind::ALL.into_iter().filter_map(|kind| self.get(kind))
    }
}

pub(crate) fn fmt_f64(value: f64) -> String {
    value.to_string()
}

pub(crate) fn fmt_opt_f64(value: Option<f64>) -> String {
    value.map(fmt_f64).unwrap_or_default()
}

pub(crate) fn fmt_date(value: Option<NaiveDate>) -> String {
    value
        .map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

pub(crate) fn fmt_timestamp(value: Option<NaiveDateTime>) -> String {
    value
        .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

/// Product as generated, before cleaning. `unit_cost` may be dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct RawProduct {
    pub product_id: String,
    pub category: Category,
    pub brand: String,
    pub base_price: f64,
    pub unit_cost: Option<f64>,
    pub tax_rate: f64,
    pub launch_flag: LaunchFlag,
}

impl TableRecord for RawProduct {
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
            fmt_opt_f64(self.unit_cost),
            fmt_f64(self.tax_rate),
            self.launch_flag.to_string(),
        ]
    }
}

/// Store as generated. `city` may be any spelling from the alias table.
#[derive(Debug, Clone, PartialEq)]
pub struct RawStore {
    pub store_id: String,
    pub city: String,
    pub channel: Channel,
    pub fulfillment_type: String,
}

impl TableRecord for RawStore {
    const KIND: TableKind = TableKind::Stores;

    fn columns() -> &'static [&'static str] {
        &["store_id", "city", "channel", "fulfillment_type"]
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.store_id.clone(),
            self.city.clone(),
            self.channel.to_string(),
            self.fulfillment_type.clone(),
        ]
    }
}

/// Sale as generated. `order_time` is kept as text so poison values survive.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSale {
    pub order_id: String,
    pub order_time: String,
    pub product_id: String,
    pub store_id: String,
    pub qty: i64,
    pub selling_price: f64,
    pub discount_pct: Option<f64>,
    pub payment_status: PaymentStatus,
    pub return_flag: bool,
}

impl TableRecord for RawSale {
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
        ]
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.order_id.clone(),
            self.order_time.clone(),
            self.product_id.clone(),
            self.store_id.clone(),
            self.qty.to_string(),
            fmt_f64(self.selling_price),
            fmt_opt_f64(self.discount_pct),
            self.payment_status.to_string(),
            self.return_flag.to_string(),
        ]
    }
}

/// Inventory snapshot as generated; stock may be negative or absurdly large.
#[derive(Debug, Clone, PartialEq)]
pub struct RawInventory {
    pub snapshot_date: NaiveDate,
    pub product_id: String,
    pub store_id: String,
    pub stock_on_hand: i64,
    pub reorder_point: i64,
    pub lead_time_days: i64,
}

impl TableRecord for RawInventory {
    const KIND: TableKind = TableKind::Inventory;

    fn columns() -> &'static [&'static str] {
        &[
            "snapshot_date",
            "product_id",
            "store_id",
            "stock_on_hand",
            "reorder_point",
            "lead_time_days",
        ]
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            fmt_date(Some(self.snapshot_date)),
            self.product_id.clone(),
            self.store_id.clone(),
            self.stock_on_hand.to_string(),
            self.reorder_point.to_string(),
            self.lead_time_days.to_string(),
        ]
    }
}

/// Campaign as generated.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCampaign {
    pub campaign_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub city: Scope<City>,
    pub channel: Scope<Channel>,
    pub category: Scope<Category>,
    pub discount_pct: f64,
    pub promo_budget: f64,
}

impl TableRecord for RawCampaign {
    const KIND: TableKind = TableKind::Campaigns;

    fn columns() -> &'static [&'static str] {
        &[
            "campaign_id",
            "start_date",
            "end_date",
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
            fmt_date(Some(self.start_date)),
            fmt_date(Some(self.end_date)),
            self.city.to_string(),
            self.channel.to_string(),
            self.category.to_string(),
            fmt_f64(self.discount_pct),
            fmt_f64(self.promo_budget),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_counters() {
        let mut table = RawTable::new(
            TableKind::Stores,
            vec!["store_id".into(), "city".into(), "channel".into()],
        );
        table.push_row(vec!["S1".into(), "DXB".into(), "App".into()]);
        table.push_row(vec!["S1".into(), "DXB".into(), "App".into()]);
        table.push_row(vec!["S2".into(), "".into()]);

        assert_eq!(table.duplicate_rows(), 1);
        assert_eq!(table.missing_cells(), 2);
    }

    #[test]
    fn test_dataset_slots_follow_table_kind() {
        let mut dataset = RawDataset::default();
        dataset.insert(RawTable::new(TableKind::Campaigns, Vec::new()));
        assert!(dataset.get(TableKind::Campaigns).is_some());
        assert!(dataset.get(TableKind::Sales).is_none());
        assert_eq!(dataset.tables().count(), 1);
    }
}
