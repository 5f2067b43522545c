//! End-to-end tests for the generate → clean → aggregate pipeline.

use rustc_hash::FxHashSet;
use souq_core::clean::{Cleaner, IssueKind};
use souq_core::generator::POISON_TIMESTAMPS;
use souq_core::model::Dataset;
use souq_core::{
    Category, Channel, City, GeneratorConfig, PaymentStatus, PromotionParams, RawDataset,
    RawTable, Scope, SegmentFilter, StockStatus, TableKind, compute_kpis, generate,
    simulate_segment,
};

// =============================================================================
// Test Helpers
// =============================================================================

fn config() -> GeneratorConfig {
    GeneratorConfig {
        num_sales: 2000,
        num_products: 60,
        num_stores: 12,
        num_campaigns: 8,
        days_of_data: 90,
        ..GeneratorConfig::default()
    }
}

fn table(kind: TableKind, header: &str, rows: &[&str]) -> RawTable {
    let mut table = RawTable::new(kind, header.split(',').map(str::to_string).collect());
    for row in rows {
        table.push_row(row.split(',').map(str::to_string).collect());
    }
    table
}

/// Every table carries duplicates, blanks and unparsable or unmapped cells.
fn messy_dataset() -> RawDataset {
    let mut raw = RawDataset::default();
    raw.insert(table(
        TableKind::Products,
        "product_id,category,brand,base_price,unit_cost,tax_rate,launch_flag",
        &[
            "P1,electronics,acme,1000,600,0.05,New",
            "P2,Electronics,acme,,,0.05,Regular",
            "P3,ELECTRONICS,beta,2000,,abc,",
            "P1,electronics,acme,999,1,0.05,New",
            "P4,Toys,,50,20,0.05,weird",
            ",Beauty,x,10,5,0.05,New",
        ],
    ));
    raw.insert(table(
        TableKind::Stores,
        "store_id,city,channel,fulfillment_type",
        &[
            "S1,DXB,App,own fleet",
            "S2,Ajman,Telephone,",
            "S2,Dubai,App,Own Fleet",
        ],
    ));
    raw.insert(table(
        TableKind::Sales,
        "Order_ID,Order Time,product_id,store_id,Quantity,selling_price,discount,payment_status,return_flag",
        &[
            "O1,2025-06-01 10:00:00,P1,S1,2,100,5,Paid,false",
            "O1,2025-06-01 10:00:00,P1,S1,2,100,5,Paid,false",
            "O2,2025-06-01T09:30:00,P2,S1,-3,-80,,Completed,yes",
            "O3,#VALUE!,P3,S2,,abc,10,Refunded,true",
            "O4,2025-06-02,P4,S2,4.0,40.5,0,weird,",
            "O5,01/06/2025 18:45,P1,S1,60,95,0,Failed,no",
            "O6,2025-06-03 08:00:00.250,P2,S1,1,120,15,,false",
            ",2025-06-03 12:00:00,P2,S2,1,30,0,Paid,false",
        ],
    ));
    raw.insert(table(
        TableKind::Inventory,
        "snapshot_date,product_id,store_id,stock_on_hand,reorder_point,lead_time_days",
        &[
            "2025-06-30,P1,S1,10,20,7",
            "30/06/2025,P1,S1,12,20,7",
            "2025-06-23,P1,S1,-5,20,7",
            "not_a_date,P2,S1,abc,x,",
            "2025-06-30,P3,S2,99999,50,5",
        ],
    ));
    raw.insert(table(
        TableKind::Campaigns,
        "campaign_id,start_date,end_date,city,channel,category,discount_pct,promo_budget",
        &[
            "C1,2025-06-20,2025-07-05,Dubai,App,Electronics,20,50000",
            "C2,2025-06-01,bad,Ajman,All,Toys,abc,",
            "C1,2025-06-20,2025-07-05,Dubai,App,Electronics,20,50000",
            "C3,15/06/2025,2025-06-10,,web,beauty,15,1000",
        ],
    ));
    raw
}

fn cleaned() -> Dataset {
    let data = generate(&config()).unwrap();
    let (dataset, _) = Cleaner::default()
        .clean_dataset(&data.to_raw_dataset())
        .unwrap();
    dataset
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn test_same_seed_gives_identical_tables() {
    let first = generate(&config()).unwrap().to_raw_dataset();
    let second = generate(&config()).unwrap().to_raw_dataset();
    assert_eq!(first, second);

    for kind in TableKind::ALL {
        let a = first.get(kind).unwrap();
        let b = second.get(kind).unwrap();
        let render = |t: &souq_core::RawTable| {
            t.rows
                .iter()
                .map(|r| r.join(","))
                .collect::<Vec<_>>()
                .join("\n")
        };
        assert_eq!(render(a), render(b), "{kind} differs between runs");
    }
}

#[test]
fn test_cleaning_is_idempotent() {
    let once = cleaned();
    let (twice, report) = Cleaner::default().clean_dataset(&once.to_raw_dataset()).unwrap();

    assert_eq!(once, twice);
    assert_eq!(report.total_duplicates_removed(), 0);
    assert_eq!(report.counts_by_kind().get(&IssueKind::UnmappedCity), None);
}

#[test]
fn test_cleaning_messy_tables_is_idempotent() {
    let cleaner = Cleaner::default();
    let (once, report) = cleaner.clean_dataset(&messy_dataset()).unwrap();

    assert_eq!(report.total_duplicates_removed(), 5);
    assert_eq!(once.products.len(), 4);
    assert_eq!(once.stores.len(), 2);
    assert_eq!(once.sales.len(), 6);
    assert_eq!(once.inventory.len(), 4);
    assert_eq!(once.campaigns.len(), 3);

    let p2 = once.products.iter().find(|p| p.product_id == "P2").unwrap();
    assert_eq!(p2.base_price, 1500.0);
    assert_eq!(p2.unit_cost, 900.0);
    assert_eq!(once.products[3].category, Category::Unknown);

    assert_eq!(once.stores[0].city_clean, City::Dubai);
    assert_eq!(once.stores[1].city_clean, City::Unknown);
    assert_eq!(once.stores[1].channel, Channel::Unknown);

    let o2 = &once.sales[1];
    assert_eq!((o2.qty, o2.selling_price), (3, 80.0));
    assert_eq!(o2.payment_status, PaymentStatus::Paid);
    let o3 = &once.sales[2];
    assert_eq!(o3.order_time, None);
    assert_eq!(o3.selling_price, 95.0);
    assert!(once.sales[4].is_outlier);

    assert_eq!(once.inventory[2].snapshot_date, None);
    assert_eq!(once.inventory[2].stock_on_hand, 0);
    assert!(once.inventory[3].is_anomaly);

    assert!(once.campaigns[0].is_active);
    assert_eq!(once.campaigns[1].end_date, None);
    assert_eq!(once.campaigns[1].city, Scope::Only(City::Unknown));
    assert_eq!(once.campaigns[2].duration_days, Some(-5));
    assert_eq!(once.campaigns[2].city, Scope::All);

    let (twice, report) = cleaner.clean_dataset(&once.to_raw_dataset()).unwrap();
    assert_eq!(once, twice);
    assert_eq!(report.total_duplicates_removed(), 0);
}

#[test]
fn test_revenue_is_qty_times_price() {
    for sale in cleaned().sales {
        assert_eq!(sale.revenue, sale.qty as f64 * sale.selling_price);
    }
}

#[test]
fn test_city_clean_is_always_canonical() {
    let dataset = cleaned();
    assert!(!dataset.stores.is_empty());
    for store in &dataset.stores {
        assert!(
            City::KNOWN.contains(&store.city_clean),
            "{} mapped to {}",
            store.city,
            store.city_clean
        );
    }

    let mut all_variants = config();
    all_variants.defects.city_variants = 1.0;
    let data = generate(&all_variants).unwrap();
    let stores = Cleaner::default()
        .clean_stores(data.to_raw_dataset().get(TableKind::Stores).unwrap())
        .unwrap()
        .records;
    for store in &stores {
        assert_ne!(store.city, store.city_clean.as_str());
        assert!(City::KNOWN.contains(&store.city_clean));
    }
}

#[test]
fn test_duplicate_orders_collapse_to_one() {
    let data = generate(&config()).unwrap();
    let raw = data.to_raw_dataset();
    let cleaned = Cleaner::default()
        .clean_sales(raw.get(TableKind::Sales).unwrap())
        .unwrap();

    // 0.75% of 2000
    assert_eq!(data.sales.len(), 2015);
    assert_eq!(cleaned.report.duplicates_removed, 15);
    assert_eq!(cleaned.records.len(), 2000);

    let ids: FxHashSet<&str> = cleaned.records.iter().map(|s| s.order_id.as_str()).collect();
    assert_eq!(ids.len(), cleaned.records.len());
}

#[test]
fn test_corrupted_timestamps_are_counted_not_fatal() {
    let data = generate(&config()).unwrap();
    let poisoned: FxHashSet<&str> = data
        .sales
        .iter()
        .filter(|s| POISON_TIMESTAMPS.contains(&s.order_time.as_str()))
        .map(|s| s.order_id.as_str())
        .collect();
    assert!(!poisoned.is_empty());

    let cleaned = Cleaner::default()
        .clean_sales(data.to_raw_dataset().get(TableKind::Sales).unwrap())
        .unwrap();
    let undated = cleaned.records.iter().filter(|s| s.order_time.is_none()).count();
    assert_eq!(undated, poisoned.len());

    let flagged = cleaned.report.count(IssueKind::InvalidDate) + cleaned.report.count(IssueKind::MissingValue);
    assert!(flagged >= undated);
}

#[test]
fn test_stock_anomalies_are_flagged() {
    let dataset = cleaned();
    for row in &dataset.inventory {
        assert_eq!(row.is_anomaly, row.stock_on_hand < 0 || row.stock_on_hand > 9000);
        if row.stock_on_hand <= 0 {
            assert_eq!(row.stock_status, StockStatus::Critical);
        }
    }
    assert!(dataset.inventory.iter().any(|r| r.is_anomaly));
}

#[test]
fn test_kpis_and_simulation_run_on_generated_data() {
    let dataset = cleaned();
    let kpis = compute_kpis(&dataset, &SegmentFilter::default());
    let revenue: f64 = dataset.sales.iter().map(|s| s.revenue).sum();

    assert_eq!(kpis.total_orders, 2000);
    assert!((kpis.total_revenue - revenue).abs() < 1e-6);
    assert!(kpis.observed_days >= 80);
    assert_eq!(kpis.stock_positions, 50 * 10);

    let outcome = simulate_segment(&dataset, &SegmentFilter::default(), &PromotionParams::default()).unwrap();
    assert!(outcome.incremental_revenue.is_finite());
    assert!(!outcome.unit_cost_estimated);
}
