//! Raw tables in, typed records and a quality report out.
//!
//! Each table is cleaned independently. For every table the cleaner:
//!
//! 1. resolves the header against the table schema (aliases, casing),
//! 2. drops rows without a natural key and later repeats of a key,
//! 3. coerces cells, counting every missing or unparsable value,
//! 4. imputes what can be imputed and flags what looks wrong,
//! 5. derives the computed columns.
//!
//! Cleaning a table that was itself produced by the cleaner returns the same
//! records. Dropping flagged rows ([`CleaningPolicy::remove_outliers`]) moves
//! the price percentile, so that guarantee only holds with the default policy.

mod coerce;
mod quality;

pub use coerce::{Cell, parse_bool, parse_date, parse_integer, parse_number, parse_timestamp, title_case};
pub use quality::{IssueKind, QualityIssue, QualityReport, TableReport, TableSummary};

use chrono::{NaiveDate, NaiveDateTime};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::generator::default_end_date;
use crate::model::{
    Campaign, Category, Channel, City, DATE_FORMAT, Dataset, InventorySnapshot, LaunchFlag,
    PaymentStatus, Product, RawDataset, RawTable, Sale, Scope, StockStatus, Store,
};
use crate::schema::{ColumnMap, TableKind};
use crate::stats::{median, quantile, round2};
use quality::IssueTally;

/// Orders above this quantity are flagged as outliers.
pub const MAX_REGULAR_QTY: i64 = 20;

/// Prices above this multiple of the 99th percentile are flagged as outliers.
pub const PRICE_OUTLIER_FACTOR: f64 = 2.0;

/// Stock above this level is treated as a data-entry anomaly.
pub const MAX_PLAUSIBLE_STOCK: i64 = 9000;

/// Cost/price ratio used when a category has no product with both values.
pub const FALLBACK_COST_RATIO: f64 = 0.5;

pub const DEFAULT_TAX_RATE: f64 = 0.05;
pub const DEFAULT_REORDER_POINT: i64 = 50;
pub const DEFAULT_LEAD_TIME_DAYS: i64 = 7;

const UNKNOWN_TEXT: &str = "Unknown";

/// Knobs that change cleaning output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningPolicy {
    /// Date against which campaign `is_active` is evaluated.
    pub reference_date: NaiveDate,
    /// Drop outlier sales and anomalous stock rows after flagging them.
    pub remove_outliers: bool,
}

impl Default for CleaningPolicy {
    fn default() -> Self {
        Self {
            reference_date: default_end_date(),
            remove_outliers: false,
        }
    }
}

/// Records of one table together with what was found while cleaning them.
#[derive(Debug, Clone, PartialEq)]
pub struct Cleaned<T> {
    pub records: Vec<T>,
    pub report: TableReport,
}

#[derive(Debug, Clone, Default)]
pub struct Cleaner {
    policy: CleaningPolicy,
}

impl Cleaner {
    pub fn new(policy: CleaningPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &CleaningPolicy {
        &self.policy
    }

    /// Clean every present table.
    ///
    /// # Errors
    /// Fails on the first table whose header does not satisfy its schema.
    /// Use [`Cleaner::clean_into`] to load tables independently.
    pub fn clean_dataset(&self, raw: &RawDataset) -> Result<(Dataset, QualityReport)> {
        let mut dataset = Dataset::default();
        let mut report = QualityReport::default();
        for table in raw.tables() {
            report.upsert(self.clean_into(table, &mut dataset)?);
        }
        Ok((dataset, report))
    }

    /// Clean one table and store its records in the matching slot of `dataset`.
    pub fn clean_into(&self, raw: &RawTable, dataset: &mut Dataset) -> Result<TableReport> {
        let report = match raw.kind {
            TableKind::Products => {
                let cleaned = self.clean_products(raw)?;
                dataset.products = cleaned.records;
                cleaned.report
            }
            TableKind::Stores => {
                let cleaned = self.clean_stores(raw)?;
                dataset.stores = cleaned.records;
                cleaned.report
            }
            TableKind::Sales => {
                let cleaned = self.clean_sales(raw)?;
                dataset.sales = cleaned.records;
                cleaned.report
            }
            TableKind::Inventory => {
                let cleaned = self.clean_inventory(raw)?;
                dataset.inventory = cleaned.records;
                cleaned.report
            }
            TableKind::Campaigns => {
                let cleaned = self.clean_campaigns(raw)?;
                dataset.campaigns = cleaned.records;
                cleaned.report
            }
        };

        info!(
            table = %report.table,
            input = report.input_rows,
            output = report.output_rows,
            duplicates = report.duplicates_removed,
            issues = report.issues.len(),
            "cleaned table"
        );
        Ok(report)
    }

    pub fn clean_products(&self, raw: &RawTable) -> Result<Cleaned<Product>> {
        let map = resolve(raw, TableKind::Products)?;
        let mut tally = IssueTally::new(TableKind::Products, raw.len());
        let rows = dedupe(raw, &map, &["product_id"], &mut tally);
        let duplicates_removed = rows.duplicates;

        struct Draft {
            product_id: String,
            category: Category,
            brand: String,
            base_price: Option<f64>,
            unit_cost: Option<f64>,
            tax_rate: f64,
            launch_flag: LaunchFlag,
        }

        let mut counts = Counts::default();
        let mut drafts = Vec::with_capacity(rows.kept.len());
        for row in &rows.kept {
            let category = match Category::from_label(cell(&map, row, "category")) {
                Some(category) => category,
                None => {
                    counts.unknown_category += 1;
                    Category::Unknown
                }
            };
            let base_price = counts.number(cell(&map, row, "base_price"), "base_price");
            let unit_cost = counts.number(cell(&map, row, "unit_cost"), "unit_cost");
            let tax_rate = parse_number(cell(&map, row, "tax_rate"))
                .value()
                .unwrap_or(DEFAULT_TAX_RATE);
            let launch_flag =
                LaunchFlag::from_label(cell(&map, row, "launch_flag")).unwrap_or(LaunchFlag::Regular);

            drafts.push(Draft {
                product_id: cell(&map, row, "product_id").to_string(),
                category,
                brand: text_or_unknown(cell(&map, row, "brand")),
                base_price,
                unit_cost,
                tax_rate,
                launch_flag,
            });
        }

        let mut prices: FxHashMap<Category, Vec<f64>> = FxHashMap::default();
        let mut ratios: FxHashMap<Category, Vec<f64>> = FxHashMap::default();
        for draft in &drafts {
            if let Some(base) = draft.base_price {
                prices.entry(draft.category).or_default().push(base);
                if let Some(cost) = draft.unit_cost.filter(|_| base > 0.0) {
                    ratios.entry(draft.category).or_default().push(cost / base);
                }
            }
        }
        let all_prices: Vec<f64> = prices.values().flatten().copied().collect();
        let overall_price = median(&all_prices).unwrap_or(0.0);

        let mut imputed_costs = 0;
        let records: Vec<Product> = drafts
            .into_iter()
            .map(|draft| {
                let base_price = draft.base_price.unwrap_or_else(|| {
                    prices
                        .get(&draft.category)
                        .and_then(|p| median(p))
                        .unwrap_or(overall_price)
                });
                let unit_cost = draft.unit_cost.unwrap_or_else(|| {
                    imputed_costs += 1;
                    let ratio = ratios
                        .get(&draft.category)
                        .and_then(|r| median(r))
                        .unwrap_or(FALLBACK_COST_RATIO);
                    round2(base_price * ratio)
                });
                Product {
                    product_id: draft.product_id,
                    category: draft.category,
                    brand: draft.brand,
                    base_price,
                    unit_cost,
                    tax_rate: draft.tax_rate,
                    launch_flag: draft.launch_flag,
                }
            })
            .collect();

        debug!(imputed_costs, "imputed unit_cost from category cost ratios");
        counts.flush(&mut tally);
        tally.record(
            IssueKind::UnknownCategory,
            counts.unknown_category,
            "category not recognised, set to Unknown",
        );

        let report = tally.finish(raw, records.len(), duplicates_removed);
        Ok(Cleaned { records, report })
    }

    pub fn clean_stores(&self, raw: &RawTable) -> Result<Cleaned<Store>> {
        let map = resolve(raw, TableKind::Stores)?;
        let mut tally = IssueTally::new(TableKind::Stores, raw.len());
        let rows = dedupe(raw, &map, &["store_id"], &mut tally);

        let mut unmapped = 0;
        let mut unknown_channel = 0;
        let records: Vec<Store> = rows
            .kept
            .iter()
            .map(|row| {
                let city = cell(&map, row, "city").to_string();
                let city_clean = City::lookup(&city).unwrap_or_else(|| {
                    unmapped += 1;
                    City::Unknown
                });
                let channel = Channel::from_label(cell(&map, row, "channel")).unwrap_or_else(|| {
                    unknown_channel += 1;
                    Channel::Unknown
                });
                Store {
                    store_id: cell(&map, row, "store_id").to_string(),
                    city,
                    city_clean,
                    channel,
                    fulfillment_type: text_or_unknown(cell(&map, row, "fulfillment_type")),
                }
            })
            .collect();

        tally.record(
            IssueKind::UnmappedCity,
            unmapped,
            "city spelling not in alias table, set to Unknown",
        );
        tally.record(
            IssueKind::UnknownChannel,
            unknown_channel,
            "channel not recognised, set to Unknown",
        );

        let report = tally.finish(raw, records.len(), rows.duplicates);
        Ok(Cleaned { records, report })
    }

    pub fn clean_sales(&self, raw: &RawTable) -> Result<Cleaned<Sale>> {
        let map = resolve(raw, TableKind::Sales)?;
        let mut tally = IssueTally::new(TableKind::Sales, raw.len());
        let rows = dedupe(raw, &map, &["order_id"], &mut tally);

        struct Draft {
            order_id: String,
            order_time: Option<NaiveDateTime>,
            product_id: String,
            store_id: String,
            qty: i64,
            selling_price: Option<f64>,
            discount_pct: f64,
            payment_status: PaymentStatus,
            return_flag: bool,
        }

        let mut counts = Counts::default();
        let mut invalid_dates = 0;
        let mut negative = 0;
        let mut drafts = Vec::with_capacity(rows.kept.len());

        for row in &rows.kept {
            let order_time = match parse_timestamp(cell(&map, row, "order_time")) {
                Cell::Value(ts) => Some(ts),
                Cell::Missing => {
                    counts.missing("order_time");
                    None
                }
                Cell::Invalid => {
                    invalid_dates += 1;
                    None
                }
            };

            let qty = match parse_integer(cell(&map, row, "qty")) {
                Cell::Value(q) if q < 0 => {
                    negative += 1;
                    q.abs()
                }
                Cell::Value(q) => q,
                Cell::Missing => {
                    counts.missing("qty");
                    1
                }
                Cell::Invalid => {
                    counts.invalid("qty");
                    1
                }
            };

            let selling_price = counts
                .number(cell(&map, row, "selling_price"), "selling_price")
                .map(|price| {
                    if price < 0.0 {
                        negative += 1;
                    }
                    price.abs()
                });

            let discount_pct = counts
                .number(cell(&map, row, "discount_pct"), "discount_pct")
                .unwrap_or(0.0);

            let status = cell(&map, row, "payment_status");
            let payment_status = if status.is_empty() {
                PaymentStatus::Paid
            } else {
                PaymentStatus::parse(status).unwrap_or(PaymentStatus::Unknown)
            };

            drafts.push(Draft {
                order_id: cell(&map, row, "order_id").to_string(),
                order_time,
                product_id: cell(&map, row, "product_id").to_string(),
                store_id: cell(&map, row, "store_id").to_string(),
                qty,
                selling_price,
                discount_pct,
                payment_status,
                return_flag: parse_bool(cell(&map, row, "return_flag"))
                    .value()
                    .unwrap_or(false),
            });
        }

        let known_prices: Vec<f64> = drafts.iter().filter_map(|d| d.selling_price).collect();
        let fill_price = median(&known_prices).unwrap_or(0.0);

        let mut records: Vec<Sale> = drafts
            .into_iter()
            .map(|draft| {
                let selling_price = draft.selling_price.unwrap_or(fill_price);
                Sale {
                    order_id: draft.order_id,
                    order_time: draft.order_time,
                    product_id: draft.product_id,
                    store_id: draft.store_id,
                    qty: draft.qty,
                    selling_price,
                    discount_pct: draft.discount_pct,
                    payment_status: draft.payment_status,
                    return_flag: draft.return_flag,
                    revenue: draft.qty as f64 * selling_price,
                    is_outlier: false,
                }
            })
            .collect();

        let prices: Vec<f64> = records.iter().map(|s| s.selling_price).collect();
        let price_limit = quantile(&prices, 0.99).map(|p99| p99 * PRICE_OUTLIER_FACTOR);
        let mut outliers = 0;
        for sale in &mut records {
            let price_outlier = price_limit.is_some_and(|limit| sale.selling_price > limit);
            sale.is_outlier = sale.qty > MAX_REGULAR_QTY || price_outlier;
            if sale.is_outlier {
                outliers += 1;
            }
        }
        debug!(?price_limit, outliers, "flagged sales outliers");

        counts.flush(&mut tally);
        tally.record(
            IssueKind::InvalidDate,
            invalid_dates,
            "unparsable order_time, excluded from time-based figures",
        );
        tally.record(
            IssueKind::NegativeValues,
            negative,
            "negative qty or selling_price, replaced by absolute value",
        );
        tally.record(
            IssueKind::Outliers,
            outliers,
            format!("qty > {MAX_REGULAR_QTY} or selling_price > {PRICE_OUTLIER_FACTOR}x p99"),
        );

        if self.policy.remove_outliers {
            records.retain(|s| !s.is_outlier);
        }

        let report = tally.finish(raw, records.len(), rows.duplicates);
        Ok(Cleaned { records, report })
    }

    pub fn clean_inventory(&self, raw: &RawTable) -> Result<Cleaned<InventorySnapshot>> {
        let map = resolve(raw, TableKind::Inventory)?;
        let mut tally = IssueTally::new(TableKind::Inventory, raw.len());
        // Dates key by their parsed value so `30/06/2025` and `2025-06-30` collide,
        // and unreadable dates key the same as blank ones.
        let rows = dedupe_by(raw, &map, &["product_id", "store_id"], &mut tally, |row| {
            match parse_date(cell(&map, row, "snapshot_date")) {
                Cell::Value(date) => date.format(DATE_FORMAT).to_string(),
                Cell::Missing | Cell::Invalid => String::new(),
            }
        });

        let mut counts = Counts::default();
        let mut invalid_dates = 0;
        let mut negative = 0;
        let mut extreme = 0;

        let mut records: Vec<InventorySnapshot> = rows
            .kept
            .iter()
            .map(|row| {
                let snapshot_date = match parse_date(cell(&map, row, "snapshot_date")) {
                    Cell::Value(date) => Some(date),
                    _ => {
                        invalid_dates += 1;
                        None
                    }
                };
                let stock_on_hand = counts
                    .integer(cell(&map, row, "stock_on_hand"), "stock_on_hand")
                    .unwrap_or(0);
                let reorder_point = parse_integer(cell(&map, row, "reorder_point"))
                    .value()
                    .unwrap_or(DEFAULT_REORDER_POINT);
                let lead_time_days = parse_integer(cell(&map, row, "lead_time_days"))
                    .value()
                    .unwrap_or(DEFAULT_LEAD_TIME_DAYS);

                if stock_on_hand < 0 {
                    negative += 1;
                } else if stock_on_hand > MAX_PLAUSIBLE_STOCK {
                    extreme += 1;
                }

                InventorySnapshot {
                    snapshot_date,
                    product_id: cell(&map, row, "product_id").to_string(),
                    store_id: cell(&map, row, "store_id").to_string(),
                    stock_on_hand,
                    reorder_point,
                    lead_time_days,
                    stock_status: StockStatus::classify(stock_on_hand, reorder_point),
                    is_anomaly: !(0..=MAX_PLAUSIBLE_STOCK).contains(&stock_on_hand),
                }
            })
            .collect();

        counts.flush(&mut tally);
        tally.record(IssueKind::InvalidDate, invalid_dates, "unparsable snapshot_date");
        tally.record(IssueKind::NegativeValues, negative, "negative stock_on_hand");
        tally.record(
            IssueKind::StockAnomaly,
            extreme,
            format!("stock_on_hand above {MAX_PLAUSIBLE_STOCK}"),
        );

        if self.policy.remove_outliers {
            records.retain(|r| !r.is_anomaly);
        }

        let report = tally.finish(raw, records.len(), rows.duplicates);
        Ok(Cleaned { records, report })
    }

    pub fn clean_campaigns(&self, raw: &RawTable) -> Result<Cleaned<Campaign>> {
        let map = resolve(raw, TableKind::Campaigns)?;
        let mut tally = IssueTally::new(TableKind::Campaigns, raw.len());
        let rows = dedupe(raw, &map, &["campaign_id"], &mut tally);
        let today = self.policy.reference_date;

        let mut counts = Counts::default();
        let mut invalid_dates = 0;
        let mut unmapped = 0;
        let mut unknown_channel = 0;
        let mut unknown_category = 0;

        let records: Vec<Campaign> = rows
            .kept
            .iter()
            .map(|row| {
                let mut date = |column: &str| match parse_date(cell(&map, row, column)) {
                    Cell::Value(date) => Some(date),
                    _ => {
                        invalid_dates += 1;
                        None
                    }
                };
                let start_date = date("start_date");
                let end_date = date("end_date");

                let (duration_days, is_active) = match (start_date, end_date) {
                    (Some(start), Some(end)) => {
                        (Some((end - start).num_days()), start <= today && today <= end)
                    }
                    _ => (None, false),
                };

                let city = Scope::parse_with(cell(&map, row, "city"), City::lookup)
                    .unwrap_or_else(|| {
                        unmapped += 1;
                        Scope::Only(City::Unknown)
                    });
                let channel = Scope::parse_with(cell(&map, row, "channel"), Channel::from_label)
                    .unwrap_or_else(|| {
                        unknown_channel += 1;
                        Scope::Only(Channel::Unknown)
                    });
                let category = Scope::parse_with(cell(&map, row, "category"), Category::from_label)
                    .unwrap_or_else(|| {
                        unknown_category += 1;
                        Scope::Only(Category::Unknown)
                    });

                Campaign {
                    campaign_id: cell(&map, row, "campaign_id").to_string(),
                    start_date,
                    end_date,
                    duration_days,
                    is_active,
                    city,
                    channel,
                    category,
                    discount_pct: counts
                        .number(cell(&map, row, "discount_pct"), "discount_pct")
                        .unwrap_or(0.0),
                    promo_budget: counts
                        .number(cell(&map, row, "promo_budget"), "promo_budget")
                        .unwrap_or(0.0),
                }
            })
            .collect();

        counts.flush(&mut tally);
        tally.record(IssueKind::InvalidDate, invalid_dates, "unparsable start_date or end_date");
        tally.record(IssueKind::UnmappedCity, unmapped, "target city not in alias table");
        tally.record(IssueKind::UnknownChannel, unknown_channel, "target channel not recognised");
        tally.record(IssueKind::UnknownCategory, unknown_category, "target category not recognised");

        let report = tally.finish(raw, records.len(), rows.duplicates);
        Ok(Cleaned { records, report })
    }
}

fn resolve(raw: &RawTable, expected: TableKind) -> Result<ColumnMap> {
    if raw.kind != expected {
        return Err(Error::WrongTable {
            expected: expected.name().to_string(),
            found: raw.kind.name().to_string(),
        });
    }
    ColumnMap::resolve(raw)
}

/// Cell of an optional column, empty when the column is absent.
fn cell<'a>(map: &ColumnMap, row: &'a [String], column: &str) -> &'a str {
    map.get(row, column).unwrap_or("")
}

fn text_or_unknown(raw: &str) -> String {
    let text = title_case(raw);
    if text.is_empty() {
        UNKNOWN_TEXT.to_string()
    } else {
        text
    }
}

struct Deduped<'a> {
    kept: Vec<&'a [String]>,
    duplicates: usize,
}

/// Keep the first row per natural key, dropping rows with a blank key part.
fn dedupe<'a>(
    raw: &'a RawTable,
    map: &ColumnMap,
    key: &[&str],
    tally: &mut IssueTally,
) -> Deduped<'a> {
    dedupe_by(raw, map, key, tally, |_| String::new())
}

/// [`dedupe`] with an extra key part derived from the whole row. The extra
/// part may be blank.
fn dedupe_by<'a>(
    raw: &'a RawTable,
    map: &ColumnMap,
    key: &[&str],
    tally: &mut IssueTally,
    extra: impl Fn(&[String]) -> String,
) -> Deduped<'a> {
    let mut seen = FxHashSet::default();
    let mut kept = Vec::with_capacity(raw.len());
    let mut duplicates = 0;
    let mut blank = 0;

    for row in &raw.rows {
        let parts: Vec<&str> = key.iter().map(|column| cell(map, row, column)).collect();
        if parts.iter().any(|part| part.is_empty()) {
            blank += 1;
            continue;
        }
        let mut key = parts.join("\u{1f}");
        key.push('\u{1f}');
        key.push_str(&extra(row.as_slice()));
        if seen.insert(key) {
            kept.push(row.as_slice());
        } else {
            duplicates += 1;
        }
    }

    tally.record(
        IssueKind::MissingValue,
        blank,
        format!("rows without {} dropped", key.join("/")),
    );
    tally.record(
        IssueKind::Duplicates,
        duplicates,
        format!("repeated {} removed, first occurrence kept", key.join("/")),
    );
    Deduped { kept, duplicates }
}

/// Per-column missing/invalid counters.
#[derive(Default)]
struct Counts {
    missing: Vec<(&'static str, usize)>,
    invalid: Vec<(&'static str, usize)>,
    unknown_category: usize,
}

impl Counts {
    fn bump(list: &mut Vec<(&'static str, usize)>, column: &'static str) {
        match list.iter_mut().find(|(c, _)| *c == column) {
            Some((_, n)) => *n += 1,
            None => list.push((column, 1)),
        }
    }

    fn missing(&mut self, column: &'static str) {
        Self::bump(&mut self.missing, column);
    }

    fn invalid(&mut self, column: &'static str) {
        Self::bump(&mut self.invalid, column);
    }

    fn number(&mut self, raw: &str, column: &'static str) -> Option<f64> {
        match parse_number(raw) {
            Cell::Value(value) => Some(value),
            Cell::Missing => {
                self.missing(column);
                None
            }
            Cell::Invalid => {
                self.invalid(column);
                None
            }
        }
    }

    fn integer(&mut self, raw: &str, column: &'static str) -> Option<i64> {
        match parse_integer(raw) {
            Cell::Value(value) => Some(value),
            Cell::Missing => {
                self.missing(column);
                None
            }
            Cell::Invalid => {
                self.invalid(column);
                None
            }
        }
    }

    fn flush(&self, tally: &mut IssueTally) {
        for (column, n) in &self.missing {
            tally.record(IssueKind::MissingValue, *n, format!("missing {column}, imputed"));
        }
        for (column, n) in &self.invalid {
            tally.record(IssueKind::InvalidNumber, *n, format!("unparsable {column}, imputed"));
        }
    }
}
