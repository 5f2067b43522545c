//! Deterministic synthetic dataset generator.
//!
//! Produces the five related tables from a seeded RNG, then makes a second
//! pass that injects the data-quality defects the cleaner is expected to
//! catch: missing costs and discounts, duplicated orders, corrupted
//! timestamps, price/quantity outliers, negative and extreme stock, and
//! non-standard city spellings.
//!
//! The same [`GeneratorConfig`] always yields identical tables. Nothing here
//! reads the wall clock; the window ends at [`GeneratorConfig::end_date`].

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{
    Category, Channel, City, LaunchFlag, PaymentStatus, RawCampaign, RawDataset, RawInventory,
    RawProduct, RawSale, RawStore, Scope, TIMESTAMP_FORMAT, to_raw_table,
};
use crate::stats::round2;

pub const DEFAULT_SEED: u64 = 42;

/// Values written over `order_time` when a timestamp is corrupted.
pub const POISON_TIMESTAMPS: &[&str] = &[
    "not_a_date",
    "2024-13-45 25:61:00",
    "N/A",
    "00/00/0000 00:00",
    "#VALUE!",
];

/// Stock values injected as extreme outliers.
pub const EXTREME_STOCK: &[i64] = &[9999, 99999, 10000];

const QTY_WEIGHTS: &[(i64, u32)] = &[
    (1, 30),
    (2, 25),
    (3, 18),
    (4, 10),
    (5, 7),
    (6, 5),
    (8, 3),
    (10, 2),
];
const DISCOUNTS: &[f64] = &[0.0, 5.0, 10.0, 15.0, 20.0, 25.0];
const PAYMENT_WEIGHTS: &[(PaymentStatus, u32)] = &[
    (PaymentStatus::Paid, 85),
    (PaymentStatus::Failed, 8),
    (PaymentStatus::Refunded, 7),
];
const RETURN_PROBABILITY: f64 = 0.05;
const FULFILLMENT_TYPES: &[&str] = &["Own Fleet", "Third Party", "Click & Collect"];
const CAMPAIGN_DISCOUNTS: &[f64] = &[10.0, 15.0, 20.0, 25.0, 30.0];
const VAT_RATE: f64 = 0.05;

/// Anchor date for the default generation window.
pub fn default_end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 30).unwrap_or_default()
}

/// Fractions of rows touched by each injected defect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefectRates {
    pub missing_unit_cost: f64,
    pub missing_discount: f64,
    pub duplicate_orders: f64,
    pub corrupted_timestamps: f64,
    pub outliers: f64,
    pub negative_stock: f64,
    pub extreme_stock: f64,
    /// Share of stores whose city is written with a non-standard spelling.
    pub city_variants: f64,
}

impl Default for DefectRates {
    fn default() -> Self {
        Self {
            missing_unit_cost: 0.015,
            missing_discount: 0.03,
            duplicate_orders: 0.0075,
            corrupted_timestamps: 0.015,
            outliers: 0.004,
            negative_stock: 0.02,
            extreme_stock: 0.01,
            city_variants: 0.35,
        }
    }
}

impl DefectRates {
    /// No defects at all; useful for tests that need clean input.
    pub fn none() -> Self {
        Self {
            missing_unit_cost: 0.0,
            missing_discount: 0.0,
            duplicate_orders: 0.0,
            corrupted_timestamps: 0.0,
            outliers: 0.0,
            negative_stock: 0.0,
            extreme_stock: 0.0,
            city_variants: 0.0,
        }
    }

    fn entries(&self) -> [(&'static str, f64); 8] {
        [
            ("missing_unit_cost", self.missing_unit_cost),
            ("missing_discount", self.missing_discount),
            ("duplicate_orders", self.duplicate_orders),
            ("corrupted_timestamps", self.corrupted_timestamps),
            ("outliers", self.outliers),
            ("negative_stock", self.negative_stock),
            ("extreme_stock", self.extreme_stock),
            ("city_variants", self.city_variants),
        ]
    }
}

/// Size and shape of a generated dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub num_sales: usize,
    pub num_products: usize,
    pub num_stores: usize,
    pub num_campaigns: usize,
    /// Length of the sales history window.
    pub days_of_data: u32,
    /// Last day of the window, and the date of the newest inventory snapshot.
    pub end_date: NaiveDate,
    /// Weekly inventory snapshots, newest on `end_date`.
    pub snapshot_weeks: u32,
    /// Inventory covers the first N products...
    pub inventory_products: usize,
    /// ...in the first N stores.
    pub inventory_stores: usize,
    pub defects: DefectRates,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            num_sales: 50_000,
            num_products: 200,
            num_stores: 30,
            num_campaigns: 15,
            days_of_data: 120,
            end_date: default_end_date(),
            snapshot_weeks: 5,
            inventory_products: 50,
            inventory_stores: 10,
            defects: DefectRates::default(),
        }
    }
}

impl GeneratorConfig {
    /// Check sizes and rates before any row is drawn.
    pub fn validate(&self) -> Result<()> {
        if self.num_products == 0 {
            return Err(Error::invalid_parameter("num_products", "must be at least 1"));
        }
        if self.num_stores == 0 {
            return Err(Error::invalid_parameter("num_stores", "must be at least 1"));
        }
        if !(1..=3650).contains(&self.days_of_data) {
            return Err(Error::invalid_parameter(
                "days_of_data",
                "must be between 1 and 3650",
            ));
        }
        for (name, rate) in self.defects.entries() {
            if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
                return Err(Error::invalid_parameter(name, "must be a fraction in [0, 1]"));
            }
        }
        Ok(())
    }

    /// Stable key identifying this configuration, for memoization.
    pub fn cache_key(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn window_start(&self) -> NaiveDate {
        self.end_date - Duration::days(i64::from(self.days_of_data))
    }
}

/// Output of one generation run, still carrying its defects.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedData {
    pub products: Vec<RawProduct>,
    pub stores: Vec<RawStore>,
    pub sales: Vec<RawSale>,
    pub inventory: Vec<RawInventory>,
    pub campaigns: Vec<RawCampaign>,
}

impl GeneratedData {
    /// Convert every table into its raw, string-celled form.
    pub fn to_raw_dataset(&self) -> RawDataset {
        RawDataset {
            products: Some(to_raw_table(&self.products)),
            stores: Some(to_raw_table(&self.stores)),
            sales: Some(to_raw_table(&self.sales)),
            inventory: Some(to_raw_table(&self.inventory)),
            campaigns: Some(to_raw_table(&self.campaigns)),
        }
    }
}

/// Generate a complete dataset for `config`.
pub fn generate(config: &GeneratorConfig) -> Result<GeneratedData> {
    config.validate()?;

    let mut generator = Generator {
        config,
        rng: StdRng::seed_from_u64(config.seed),
    };

    let products = generator.products();
    let stores = generator.stores();
    let sales = generator.sales(&products, &stores);
    let inventory = generator.inventory(&products, &stores);
    let campaigns = generator.campaigns();

    let mut data = GeneratedData {
        products,
        stores,
        sales,
        inventory,
        campaigns,
    };
    generator.inject_defects(&mut data);

    info!(
        seed = config.seed,
        products = data.products.len(),
        stores = data.stores.len(),
        sales = data.sales.len(),
        inventory = data.inventory.len(),
        campaigns = data.campaigns.len(),
        "generated synthetic dataset"
    );

    Ok(data)
}

struct Generator<'a> {
    config: &'a GeneratorConfig,
    rng: StdRng,
}

impl Generator<'_> {
    fn pick<'s, T>(&mut self, items: &'s [T]) -> &'s T {
        &items[self.rng.gen_range(0..items.len())]
    }

    fn pick_weighted<T: Copy>(&mut self, items: &[(T, u32)]) -> T {
        let total: u32 = items.iter().map(|(_, w)| w).sum();
        let mut roll = self.rng.gen_range(0..total);
        for (item, weight) in items {
            if roll < *weight {
                return *item;
            }
            roll -= weight;
        }
        items[items.len() - 1].0
    }

    /// Sorted row indices for a defect touching `rate` of `len` rows.
    fn pick_rows(&mut self, len: usize, rate: f64) -> Vec<usize> {
        let amount = ((len as f64 * rate).round() as usize).min(len);
        if amount == 0 {
            return Vec::new();
        }
        let mut rows = sample(&mut self.rng, len, amount).into_vec();
        rows.sort_unstable();
        rows
    }

    fn products(&mut self) -> Vec<RawProduct> {
        (0..self.config.num_products)
            .map(|i| {
                let category = *self.pick(&Category::KNOWN);
                let (low, high) = price_range(category);
                let base_price = round2(self.rng.gen_range(low..high));
                let cost_ratio = self.rng.gen_range(0.45..0.75);
                RawProduct {
                    product_id: format!("PROD_{:04}", i + 1),
                    category,
                    brand: format!("Brand_{:02}", self.rng.gen_range(1..=20)),
                    base_price,
                    unit_cost: Some(round2(base_price * cost_ratio)),
                    tax_rate: VAT_RATE,
                    launch_flag: if self.rng.gen_bool(0.15) {
                        LaunchFlag::New
                    } else {
                        LaunchFlag::Regular
                    },
                }
            })
            .collect()
    }

    fn stores(&mut self) -> Vec<RawStore> {
        let variant_rate = self.config.defects.city_variants;
        (0..self.config.num_stores)
            .map(|i| {
                let city = *self.pick(&City::KNOWN);
                let spelling = if self.rng.gen_bool(variant_rate) {
                    *self.pick(&city.variants())
                } else {
                    city.as_str()
                };
                RawStore {
                    store_id: format!("STORE_{:03}", i + 1),
                    city: spelling.to_string(),
                    channel: *self.pick(&Channel::KNOWN),
                    fulfillment_type: self.pick(FULFILLMENT_TYPES).to_string(),
                }
            })
            .collect()
    }

    fn sales(&mut self, products: &[RawProduct], stores: &[RawStore]) -> Vec<RawSale> {
        let start = self.config.window_start();
        let days = i64::from(self.config.days_of_data);

        (0..self.config.num_sales)
            .map(|i| {
                let date = start + Duration::days(self.rng.gen_range(0..=days));
                let hour = self.rng.gen_range(8..=22);
                let minute = self.rng.gen_range(0..60);
                let second = self.rng.gen_range(0..60);
                let order_time = date
                    .and_hms_opt(hour, minute, second)
                    .unwrap_or_default()
                    .format(TIMESTAMP_FORMAT)
                    .to_string();

                let product = self.pick(products);
                let store = self.pick(stores);
                let qty = self.pick_weighted(QTY_WEIGHTS);
                let discount = *self.pick(DISCOUNTS);
                let jitter = self.rng.gen_range(0.95..1.05);
                let selling_price = round2(product.base_price * (1.0 - discount / 100.0) * jitter);

                let payment_status = self.pick_weighted(PAYMENT_WEIGHTS);
                let return_flag = payment_status == PaymentStatus::Paid
                    && self.rng.gen_bool(RETURN_PROBABILITY);

                RawSale {
                    order_id: format!("ORD_{:06}", i + 1),
                    order_time,
                    product_id: product.product_id.clone(),
                    store_id: store.store_id.clone(),
                    qty,
                    selling_price,
                    discount_pct: Some(discount),
                    payment_status,
                    return_flag,
                }
            })
            .collect()
    }

    fn inventory(&mut self, products: &[RawProduct], stores: &[RawStore]) -> Vec<RawInventory> {
        let products = &products[..self.config.inventory_products.min(products.len())];
        let stores = &stores[..self.config.inventory_stores.min(stores.len())];
        let mut rows = Vec::new();

        for week in (0..self.config.snapshot_weeks).rev() {
            let snapshot_date = self.config.end_date - Duration::days(7 * i64::from(week));
            for product in products {
                for store in stores {
                    rows.push(RawInventory {
                        snapshot_date,
                        product_id: product.product_id.clone(),
                        store_id: store.store_id.clone(),
                        stock_on_hand: self.rng.gen_range(0..=500),
                        reorder_point: self.rng.gen_range(20..=100),
                        lead_time_days: self.rng.gen_range(3..=14),
                    });
                }
            }
        }
        rows
    }

    fn campaigns(&mut self) -> Vec<RawCampaign> {
        let start = self.config.window_start();
        let latest_offset = i64::from(self.config.days_of_data.saturating_sub(14));

        (0..self.config.num_campaigns)
            .map(|i| {
                let start_date = start + Duration::days(self.rng.gen_range(0..=latest_offset));
                let duration = self.rng.gen_range(3..=14);
                let city = self.scope(&City::KNOWN);
                let channel = self.scope(&Channel::KNOWN);
                let category = self.scope(&Category::KNOWN);
                RawCampaign {
                    campaign_id: format!("CAMP_{:03}", i + 1),
                    start_date,
                    end_date: start_date + Duration::days(duration),
                    city,
                    channel,
                    category,
                    discount_pct: *self.pick(CAMPAIGN_DISCOUNTS),
                    promo_budget: f64::from(self.rng.gen_range(100..=1000_u32) * 100),
                }
            })
            .collect()
    }

    fn scope<T: Copy>(&mut self, values: &[T]) -> Scope<T> {
        if self.rng.gen_bool(0.25) {
            Scope::All
        } else {
            Scope::Only(*self.pick(values))
        }
    }

    fn inject_defects(&mut self, data: &mut GeneratedData) {
        let rates = self.config.defects.clone();

        for row in self.pick_rows(data.products.len(), rates.missing_unit_cost) {
            data.products[row].unit_cost = None;
        }

        for row in self.pick_rows(data.sales.len(), rates.missing_discount) {
            data.sales[row].discount_pct = None;
        }

        for row in self.pick_rows(data.sales.len(), rates.corrupted_timestamps) {
            data.sales[row].order_time = self.pick(POISON_TIMESTAMPS).to_string();
        }

        for row in self.pick_rows(data.sales.len(), rates.outliers) {
            let sale = &mut data.sales[row];
            if self.rng.gen_bool(0.5) {
                sale.selling_price = round2(sale.selling_price * self.rng.gen_range(10.0..=20.0));
            } else {
                sale.qty = self.rng.gen_range(50..=200);
            }
        }

        let duplicates: Vec<RawSale> = self
            .pick_rows(data.sales.len(), rates.duplicate_orders)
            .into_iter()
            .map(|row| data.sales[row].clone())
            .collect();
        debug!(count = duplicates.len(), "appending duplicate orders");
        data.sales.extend(duplicates);
        data.sales.shuffle(&mut self.rng);

        for row in self.pick_rows(data.inventory.len(), rates.negative_stock) {
            data.inventory[row].stock_on_hand = -self.rng.gen_range(1..=50);
        }

        for row in self.pick_rows(data.inventory.len(), rates.extreme_stock) {
            data.inventory[row].stock_on_hand = *self.pick(EXTREME_STOCK);
        }
    }
}

/// Base price band per category, in AED.
fn price_range(category: Category) -> (f64, f64) {
    match category {
        Category::Electronics => (100.0, 3000.0),
        Category::Fashion => (40.0, 800.0),
        Category::Grocery => (5.0, 120.0),
        Category::HomeGarden => (30.0, 1200.0),
        Category::Beauty => (20.0, 400.0),
        Category::Sports => (30.0, 900.0),
        Category::Unknown => (10.0, 500.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> GeneratorConfig {
        GeneratorConfig {
            num_sales: 2000,
            num_products: 40,
            num_stores: 8,
            num_campaigns: 6,
            days_of_data: 60,
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn test_same_seed_same_tables() {
        let config = small_config();
        let first = generate(&config).unwrap();
        let second = generate(&config).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_raw_dataset(), second.to_raw_dataset());
    }

    #[test]
    fn test_different_seed_different_tables() {
        let config = small_config();
        let other = GeneratorConfig {
            seed: 7,
            ..small_config()
        };
        assert_ne!(generate(&config).unwrap(), generate(&other).unwrap());
    }

    #[test]
    fn test_defects_are_injected() {
        let data = generate(&small_config()).unwrap();

        // 0.75% of 2000 orders duplicated
        assert_eq!(data.sales.len(), 2015);
        let missing_discount = data.sales.iter().filter(|s| s.discount_pct.is_none()).count();
        assert!(missing_discount >= 60);
        let poisoned = data
            .sales
            .iter()
            .filter(|s| POISON_TIMESTAMPS.contains(&s.order_time.as_str()))
            .count();
        assert!(poisoned >= 30, "expected corrupted timestamps, got {poisoned}");
        assert_eq!(data.products.iter().filter(|p| p.unit_cost.is_none()).count(), 1);
        assert!(data.inventory.iter().any(|r| r.stock_on_hand < 0));
        assert!(data.inventory.iter().any(|r| EXTREME_STOCK.contains(&r.stock_on_hand)));
    }

    #[test]
    fn test_clean_config_has_no_defects() {
        let config = GeneratorConfig {
            defects: DefectRates::none(),
            ..small_config()
        };
        let data = generate(&config).unwrap();
        assert_eq!(data.sales.len(), 2000);
        assert!(data.sales.iter().all(|s| s.discount_pct.is_some()));
        assert!(data.inventory.iter().all(|r| (0..=500).contains(&r.stock_on_hand)));
        assert!(data.stores.iter().all(|s| City::from_label(&s.city).is_some()));
    }

    #[test]
    fn test_foreign_keys_resolve() {
        let data = generate(&small_config()).unwrap();
        for sale in &data.sales {
            assert!(data.products.iter().any(|p| p.product_id == sale.product_id));
            assert!(data.stores.iter().any(|s| s.store_id == sale.store_id));
        }
    }

    #[test]
    fn test_return_flag_only_on_paid_orders() {
        let data = generate(&small_config()).unwrap();
        assert!(
            data.sales
                .iter()
                .filter(|s| s.return_flag)
                .all(|s| s.payment_status == PaymentStatus::Paid)
        );
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = GeneratorConfig {
            num_products: 0,
            ..GeneratorConfig::default()
        };
        assert!(generate(&config).is_err());

        let mut config = GeneratorConfig::default();
        config.defects.outliers = 1.5;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidParameter { .. })
        ));
    }
}
