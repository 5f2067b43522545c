//! Aggregate views: headline KPIs and breakdowns.

use serde_json::json;
use souq_core::metrics::{
    Dimension, campaign_timeline, daily_trend, revenue_by, stock_status_counts, stock_trend,
    store_performance, time_patterns,
};
use souq_core::{AppState, LogCategory};

use crate::config::AppConfig;
use crate::output::{
    self, format_currency, format_number, format_pct, print_field, print_header, print_table,
};
use crate::source::{self, FilterArgs, SourceArgs};

pub fn kpis(
    state: &mut AppState,
    config: &AppConfig,
    source: &SourceArgs,
    filter: &FilterArgs,
    json: bool,
) -> anyhow::Result<()> {
    source::load(state, source, config)?;
    let filter = filter.filter();
    let kpis = state.kpis(&filter);
    if json {
        return output::print_json(&kpis);
    }

    print_header("Sales", Some(filter.to_string().as_str()));
    print_field("Revenue", format_currency(kpis.total_revenue), 18);
    print_field("Orders", format_number(kpis.total_orders as f64), 18);
    print_field("Units", format_number(kpis.total_units as f64), 18);
    print_field("Avg order value", format_currency(kpis.avg_order_value), 18);
    print_field("Avg discount", format_pct(kpis.avg_discount_pct), 18);
    print_field("Return rate", format_pct(kpis.return_rate_pct), 18);
    print_field("Gross margin", format_currency(kpis.gross_margin), 18);
    print_field("Gross margin %", format_pct(kpis.gross_margin_pct), 18);
    print_field("Daily revenue", format_currency(kpis.avg_daily_revenue), 18);
    print_field("Observed days", kpis.observed_days, 18);
    print_field("Outlier orders", kpis.outlier_orders, 18);
    print_field("Undated orders", kpis.undated_orders, 18);

    print_header("Inventory", Some("latest snapshot per product and store"));
    print_field("Positions", kpis.stock_positions, 18);
    print_field("Units on hand", format_number(kpis.total_stock as f64), 18);
    print_field("Critical", kpis.critical_stock, 18);
    print_field("Low", kpis.low_stock, 18);
    print_field("Healthy", kpis.healthy_stock, 18);
    print_field("Stock health", format_pct(kpis.stock_health_pct), 18);

    print_header("Campaigns", None);
    print_field("Campaigns", kpis.total_campaigns, 18);
    print_field("Active", kpis.active_campaigns, 18);
    print_field("Budget", format_currency(kpis.campaign_budget), 18);
    print_field("Avg discount", format_pct(kpis.avg_campaign_discount_pct), 18);
    Ok(())
}

/// Breakdown to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BreakdownView {
    /// Revenue by product category
    Category,
    /// Revenue by city
    City,
    /// Revenue by channel
    Channel,
    /// Revenue by store
    Store,
    /// Revenue by product
    Product,
    /// Top stores by revenue, with orders, units and AOV
    Stores,
    /// Daily revenue and orders
    Daily,
    /// Revenue by hour of day and day of week
    Time,
    /// Current stock status counts
    Stock,
    /// Stock levels per snapshot date
    StockTrend,
    /// Campaign calendar
    Campaigns,
}

impl BreakdownView {
    fn dimension(self) -> Option<Dimension> {
        match self {
            BreakdownView::Category => Some(Dimension::Category),
            BreakdownView::City => Some(Dimension::City),
            BreakdownView::Channel => Some(Dimension::Channel),
            BreakdownView::Store => Some(Dimension::Store),
            BreakdownView::Product => Some(Dimension::Product),
            _ => None,
        }
    }
}

pub fn breakdown(
    state: &mut AppState,
    config: &AppConfig,
    source: &SourceArgs,
    filter: &FilterArgs,
    view: BreakdownView,
    top: usize,
    json: bool,
) -> anyhow::Result<()> {
    source::load(state, source, config)?;
    let filter = filter.filter();
    let dataset = state.dataset();
    let segment = filter.to_string();

    if let Some(dimension) = view.dimension() {
        let groups = revenue_by(dataset, &filter, dimension);
        if json {
            output::print_json(&groups)?;
        } else {
            print_header(&format!("Revenue by {dimension}"), Some(segment.as_str()));
            let rows: Vec<Vec<String>> = groups
                .iter()
                .take(top)
                .map(|g| {
                    vec![
                        g.key.clone(),
                        format_currency(g.revenue),
                        g.orders.to_string(),
                        g.units.to_string(),
                        format_pct(g.share_pct),
                    ]
                })
                .collect();
            print_table(&[dimension.name(), "revenue", "orders", "units", "share"], &rows);
        }
    } else {
        match view {
            BreakdownView::Stores => {
                let stores = store_performance(dataset, &filter, top);
                if json {
                    output::print_json(&stores)?;
                } else {
                    print_header("Store performance", Some(segment.as_str()));
                    let rows: Vec<Vec<String>> = stores
                        .iter()
                        .map(|s| {
                            vec![
                                s.store_id.clone(),
                                s.city.clone(),
                                s.channel.clone(),
                                format_currency(s.revenue),
                                s.orders.to_string(),
                                s.units.to_string(),
                                format_currency(s.avg_order_value),
                            ]
                        })
                        .collect();
                    print_table(&["store", "city", "channel", "revenue", "orders", "units", "aov"], &rows);
                }
            }
            BreakdownView::Daily => {
                let trend = daily_trend(dataset, &filter);
                if json {
                    output::print_json(&trend)?;
                } else {
                    print_header("Daily trend", Some(segment.as_str()));
                    let rows: Vec<Vec<String>> = trend
                        .iter()
                        .map(|p| {
                            vec![
                                p.date.to_string(),
                                format_currency(p.revenue),
                                p.orders.to_string(),
                                p.units.to_string(),
                            ]
                        })
                        .collect();
                    print_table(&["date", "revenue", "orders", "units"], &rows);
                }
            }
            BreakdownView::Time => {
                let patterns = time_patterns(dataset, &filter);
                if json {
                    output::print_json(&patterns)?;
                } else {
                    print_header("Revenue by hour", Some(segment.as_str()));
                    let hourly: Vec<Vec<String>> = patterns
                        .hourly
                        .iter()
                        .map(|h| vec![format!("{:02}:00", h.hour), format_currency(h.revenue), h.orders.to_string()])
                        .collect();
                    print_table(&["hour", "revenue", "orders"], &hourly);

                    print_header("Revenue by weekday", None);
                    let weekday: Vec<Vec<String>> = patterns
                        .weekday
                        .iter()
                        .map(|w| vec![w.weekday.clone(), format_currency(w.revenue), w.orders.to_string()])
                        .collect();
                    print_table(&["weekday", "revenue", "orders"], &weekday);
                }
            }
            BreakdownView::Stock => {
                let counts = stock_status_counts(dataset, &filter);
                if json {
                    output::print_json(&counts)?;
                } else {
                    print_header("Stock status", Some(segment.as_str()));
                    let rows: Vec<Vec<String>> = counts
                        .iter()
                        .map(|c| {
                            vec![
                                c.status.to_string(),
                                c.positions.to_string(),
                                format_number(c.units as f64),
                                format_pct(c.share_pct),
                            ]
                        })
                        .collect();
                    print_table(&["status", "positions", "units", "share"], &rows);
                }
            }
            BreakdownView::StockTrend => {
                let trend = stock_trend(dataset, &filter);
                if json {
                    output::print_json(&trend)?;
                } else {
                    print_header("Stock trend", Some(segment.as_str()));
                    let rows: Vec<Vec<String>> = trend
                        .iter()
                        .map(|p| {
                            vec![
                                p.date.to_string(),
                                format_number(p.total_stock as f64),
                                p.critical.to_string(),
                                p.low.to_string(),
                                p.healthy.to_string(),
                            ]
                        })
                        .collect();
                    print_table(&["date", "stock", "critical", "low", "healthy"], &rows);
                }
            }
            BreakdownView::Campaigns => {
                let timeline = campaign_timeline(dataset, &filter);
                if json {
                    output::print_json(&timeline)?;
                } else {
                    print_header("Campaigns", Some(segment.as_str()));
                    let rows: Vec<Vec<String>> = timeline
                        .iter()
                        .map(|c| {
                            vec![
                                c.campaign_id.clone(),
                                c.start_date.map(|d| d.to_string()).unwrap_or_default(),
                                c.end_date.map(|d| d.to_string()).unwrap_or_default(),
                                if c.is_active { "active".to_string() } else { String::new() },
                                c.targeting.clone(),
                                format_pct(c.discount_pct),
                                format_currency(c.promo_budget),
                            ]
                        })
                        .collect();
                    print_table(&["campaign", "start", "end", "status", "targeting", "discount", "budget"], &rows);
                }
            }
            BreakdownView::Category
            | BreakdownView::City
            | BreakdownView::Channel
            | BreakdownView::Store
            | BreakdownView::Product => {}
        }
    }

    state.log_mut().info(
        LogCategory::Analysis,
        "computed breakdown",
        json!({ "view": format!("{view:?}"), "segment": segment }),
    );
    Ok(())
}
