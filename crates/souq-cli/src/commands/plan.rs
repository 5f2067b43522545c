//! Forward-looking commands: promotion what-if, reorder plan and demand forecast.

use clap::Args;
use souq_core::{AppState, ForecastMetric, ForecastParams, PromotionParams, ReorderParams};

use crate::colors;
use crate::config::AppConfig;
use crate::output::{
    self, format_currency, format_number, format_pct, print_field, print_header, print_table,
};
use crate::source::{self, FilterArgs, SourceArgs};

/// Promotion scenario overrides. Unset flags fall back to the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct PromotionArgs {
    /// Discount in percent (5-50)
    #[arg(long)]
    pub discount: Option<f64>,

    /// Promotion length in days (1-30)
    #[arg(long)]
    pub duration: Option<u32>,

    /// Expected unit lift during the promotion (1.0-3.0)
    #[arg(long)]
    pub lift: Option<f64>,

    /// Promotion spend in AED
    #[arg(long)]
    pub budget: Option<f64>,
}

impl PromotionArgs {
    pub fn apply(&self, base: &PromotionParams) -> PromotionParams {
        PromotionParams {
            discount_pct: self.discount.unwrap_or(base.discount_pct),
            duration_days: self.duration.unwrap_or(base.duration_days),
            lift_multiplier: self.lift.unwrap_or(base.lift_multiplier),
            budget: self.budget.unwrap_or(base.budget),
        }
    }
}

pub fn simulate(
    state: &mut AppState,
    config: &AppConfig,
    source: &SourceArgs,
    filter: &FilterArgs,
    args: &PromotionArgs,
    json: bool,
) -> anyhow::Result<()> {
    let params = args.apply(&config.promotion);
    params.validate()?;
    source::load(state, source, config)?;
    let filter = filter.filter();
    let outcome = state.simulate(&filter, &params)?;
    if json {
        return output::print_json(&outcome);
    }

    let base = &outcome.baseline;
    print_header("Baseline", Some(filter.to_string().as_str()));
    print_field("Observed days", base.observed_days, 20);
    print_field("Avg price", format_currency(base.avg_price), 20);
    print_field("Daily revenue", format_currency(base.daily_revenue), 20);
    print_field("Daily units", format!("{:.1}", base.daily_units), 20);
    print_field("Daily orders", format!("{:.1}", base.daily_orders), 20);

    let subtitle = format!(
        "{}% off for {} days at {:.1}x lift",
        params.discount_pct, params.duration_days, params.lift_multiplier
    );
    print_header("Promotion", Some(subtitle.as_str()));
    print_field("Promo price", format_currency(outcome.promo_price), 20);
    print_field("Baseline revenue", format_currency(outcome.baseline_revenue), 20);
    print_field("Promo revenue", format_currency(outcome.promo_revenue), 20);
    print_field("Incremental revenue", signed(outcome.incremental_revenue), 20);
    print_field("Incremental units", format!("{:.0}", outcome.incremental_units), 20);
    print_field("Margin impact", signed(outcome.margin_impact), 20);
    print_field("After cannibalization", signed(outcome.true_incremental_revenue), 20);
    print_field("ROI", format_pct(outcome.roi_pct), 20);
    match outcome.break_even_lift {
        Some(lift) => print_field("Break-even lift", format!("{lift:.2}x"), 20),
        None => print_field("Break-even lift", "not reachable", 20),
    }
    if outcome.unit_cost_estimated {
        output::warn("unit cost estimated from a default cost ratio; margin figures are approximate");
    }
    Ok(())
}

fn signed(value: f64) -> String {
    let color = if value < 0.0 { colors::RED } else { colors::GREEN };
    format!("{color}{}{}", format_currency(value), colors::RESET)
}

#[derive(Args, Debug, Clone)]
pub struct ReorderArgs {
    /// Days of demand held as safety stock
    #[arg(long)]
    pub safety_days: Option<u32>,

    /// Days of demand covered by one order
    #[arg(long)]
    pub cycle_days: Option<u32>,

    /// Rows to show
    #[arg(long, default_value = "20")]
    pub limit: usize,
}

impl ReorderArgs {
    pub fn apply(&self, base: &ReorderParams) -> ReorderParams {
        ReorderParams {
            safety_days: self.safety_days.unwrap_or(base.safety_days),
            cycle_days: self.cycle_days.unwrap_or(base.cycle_days),
        }
    }
}

pub fn reorder(
    state: &mut AppState,
    config: &AppConfig,
    source: &SourceArgs,
    filter: &FilterArgs,
    args: &ReorderArgs,
    json: bool,
) -> anyhow::Result<()> {
    source::load(state, source, config)?;
    let params = args.apply(&config.reorder);
    let filter = filter.filter();
    let plan = state.reorder(&filter, &params);
    if json {
        return output::print_json(&plan);
    }

    let due = plan.iter().filter(|s| s.needs_reorder).count();
    let subtitle = format!(
        "{due} of {} products need reordering ({} safety days, {} cycle days)",
        plan.len(),
        params.safety_days,
        params.cycle_days
    );
    print_header("Reorder plan", Some(subtitle.as_str()));
    let rows: Vec<Vec<String>> = plan
        .iter()
        .take(args.limit)
        .map(|s| {
            vec![
                s.product_id.clone(),
                s.category.map(|c| c.to_string()).unwrap_or_default(),
                s.current_stock.to_string(),
                format!("{:.2}", s.daily_velocity),
                s.lead_time_days.to_string(),
                format!("{:.0}", s.safety_stock),
                s.reorder_qty.to_string(),
                s.days_of_cover.map(|d| format!("{d:.1}")).unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    print_table(
        &["product", "category", "stock", "velocity", "lead", "safety", "reorder", "cover"],
        &rows,
    );
    Ok(())
}

/// Metric to forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MetricArg {
    Revenue,
    Units,
    Orders,
}

impl From<MetricArg> for ForecastMetric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Revenue => ForecastMetric::Revenue,
            MetricArg::Units => ForecastMetric::Units,
            MetricArg::Orders => ForecastMetric::Orders,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ForecastArgs {
    /// Days to forecast (1-90)
    #[arg(long)]
    pub horizon: Option<u32>,

    /// Quantity to forecast
    #[arg(long, value_enum)]
    pub metric: Option<MetricArg>,
}

impl ForecastArgs {
    pub fn apply(&self, base: &ForecastParams) -> ForecastParams {
        ForecastParams {
            horizon_days: self.horizon.unwrap_or(base.horizon_days),
            metric: self.metric.map(ForecastMetric::from).unwrap_or(base.metric),
        }
    }
}

pub fn forecast(
    state: &mut AppState,
    config: &AppConfig,
    source: &SourceArgs,
    filter: &FilterArgs,
    args: &ForecastArgs,
    json: bool,
) -> anyhow::Result<()> {
    let params = args.apply(&config.forecast);
    params.validate()?;
    source::load(state, source, config)?;
    let filter = filter.filter();
    let result = state.forecast(&filter, &params)?;
    if json {
        return output::print_json(&result);
    }

    let subtitle = format!(
        "{} over {} days, trend x{:.2}",
        result.metric, params.horizon_days, result.trend_factor
    );
    print_header("Forecast", Some(subtitle.as_str()));
    let fmt = |value: f64| match result.metric {
        ForecastMetric::Revenue => format_currency(value),
        ForecastMetric::Units | ForecastMetric::Orders => format_number(value),
    };
    print_field("History days", result.history_days, 16);
    print_field("Daily average", fmt(result.daily_average), 16);
    print_field("Horizon total", fmt(result.total), 16);
    let rows: Vec<Vec<String>> = result
        .points
        .iter()
        .map(|p| vec![p.date.to_string(), fmt(p.value), fmt(p.lower), fmt(p.upper)])
        .collect();
    println!();
    print_table(&["date", "forecast", "low", "high"], &rows);
    Ok(())
}
