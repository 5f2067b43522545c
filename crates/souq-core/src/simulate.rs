//! What-if promotion simulator.
//!
//! A closed-form projection: baseline daily velocity from history, scaled by
//! a user-supplied lift and valued at the discounted price. No fitting.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::metrics::{DimensionIndex, SegmentFilter, filter_sales, observed_days};
use crate::model::{Dataset, Sale};
use crate::stats::safe_div;

/// Share of incremental sales assumed to be pulled from adjacent periods.
pub const CANNIBALIZATION_RATE: f64 = 0.15;

/// Unit cost as a share of price when no product cost is known.
pub const DEFAULT_COST_RATIO: f64 = 0.55;

/// User inputs of a promotion scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromotionParams {
    /// 5–50.
    pub discount_pct: f64,
    /// 1–30.
    pub duration_days: u32,
    /// 1.0–3.0.
    pub lift_multiplier: f64,
    /// Promotion spend in AED; zero disables ROI.
    pub budget: f64,
}

impl Default for PromotionParams {
    fn default() -> Self {
        Self {
            discount_pct: 20.0,
            duration_days: 7,
            lift_multiplier: 1.5,
            budget: 10_000.0,
        }
    }
}

impl PromotionParams {
    pub fn validate(&self) -> Result<()> {
        if !(5.0..=50.0).contains(&self.discount_pct) {
            return Err(Error::invalid_parameter("discount_pct", "must be between 5 and 50"));
        }
        if !(1..=30).contains(&self.duration_days) {
            return Err(Error::invalid_parameter("duration_days", "must be between 1 and 30"));
        }
        if !(1.0..=3.0).contains(&self.lift_multiplier) {
            return Err(Error::invalid_parameter(
                "lift_multiplier",
                "must be between 1.0 and 3.0",
            ));
        }
        if !self.budget.is_finite() || self.budget < 0.0 {
            return Err(Error::invalid_parameter("budget", "must be zero or positive"));
        }
        Ok(())
    }
}

/// Historical daily rates of a segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Baseline {
    pub observed_days: i64,
    /// Revenue per unit sold.
    pub avg_price: f64,
    pub daily_revenue: f64,
    pub daily_units: f64,
    pub daily_orders: f64,
    /// Unit-weighted product cost, if any sold product has one.
    pub avg_unit_cost: Option<f64>,
}

impl Baseline {
    /// Measure the baseline over dated sales in the segment.
    pub fn observe(dataset: &Dataset, filter: &SegmentFilter) -> Self {
        let index = DimensionIndex::new(dataset);
        let sales: Vec<&Sale> = filter_sales(dataset, &index, filter)
            .into_iter()
            .filter(|s| s.order_time.is_some())
            .collect();
        let days = observed_days(sales.iter().copied());

        let revenue: f64 = sales.iter().map(|s| s.revenue).sum();
        let units: i64 = sales.iter().map(|s| s.qty).sum();

        let (costed_units, cost) = sales
            .iter()
            .filter_map(|s| index.product(&s.product_id).map(|p| (s.qty, s.qty as f64 * p.unit_cost)))
            .fold((0i64, 0.0), |(u, c), (qty, cost)| (u + qty, c + cost));

        let baseline = Self {
            observed_days: days,
            avg_price: safe_div(revenue, units as f64),
            daily_revenue: safe_div(revenue, days as f64),
            daily_units: safe_div(units as f64, days as f64),
            daily_orders: safe_div(sales.len() as f64, days as f64),
            avg_unit_cost: (costed_units > 0).then(|| cost / costed_units as f64),
        };
        debug!(segment = %filter, ?baseline, "observed promotion baseline");
        baseline
    }

    /// Baseline from known rates, for scenarios not backed by data.
    pub fn from_rates(avg_price: f64, daily_units: f64, daily_orders: f64, avg_unit_cost: Option<f64>) -> Self {
        Self {
            observed_days: 1,
            avg_price,
            daily_revenue: avg_price * daily_units,
            daily_units,
            daily_orders,
            avg_unit_cost,
        }
    }
}

/// Projected effect of a promotion over its whole duration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromotionOutcome {
    pub params: PromotionParams,
    pub baseline: Baseline,
    pub promo_price: f64,
    pub unit_cost: f64,
    /// True when `unit_cost` fell back to a share of the price.
    pub unit_cost_estimated: bool,

    pub baseline_revenue: f64,
    pub promo_revenue: f64,
    pub incremental_revenue: f64,
    pub baseline_units: f64,
    pub promo_units: f64,
    pub incremental_units: f64,
    pub promo_orders: f64,

    pub baseline_margin: f64,
    pub promo_margin: f64,
    /// Promo margin minus baseline margin minus budget.
    pub margin_impact: f64,
    /// Zero when the budget is zero.
    pub roi_pct: f64,

    /// Incremental revenue after the cannibalization haircut.
    pub true_incremental_revenue: f64,
    pub true_incremental_units: f64,
    /// Lift at which incremental revenue exactly covers the budget.
    pub break_even_lift: Option<f64>,
}

/// Project `params` against `baseline`.
pub fn simulate(baseline: &Baseline, params: &PromotionParams) -> Result<PromotionOutcome> {
    params.validate()?;

    let days = f64::from(params.duration_days);
    let promo_price = baseline.avg_price * (1.0 - params.discount_pct / 100.0);
    let (unit_cost, unit_cost_estimated) = match baseline.avg_unit_cost {
        Some(cost) => (cost, false),
        None => (baseline.avg_price * DEFAULT_COST_RATIO, true),
    };

    let baseline_units = baseline.daily_units * days;
    let promo_daily_units = baseline.daily_units * params.lift_multiplier;
    let promo_units = promo_daily_units * days;

    let baseline_revenue = baseline.daily_units * baseline.avg_price * days;
    let promo_revenue = promo_daily_units * promo_price * days;
    let incremental_revenue = promo_revenue - baseline_revenue;
    let incremental_units = promo_units - baseline_units;

    let baseline_margin = baseline_units * (baseline.avg_price - unit_cost);
    let promo_margin = promo_units * (promo_price - unit_cost);

    let roi_pct = if params.budget == 0.0 {
        0.0
    } else {
        (incremental_revenue - params.budget) / params.budget * 100.0
    };

    let unit_lift_revenue = baseline.daily_units * promo_price * days;
    let break_even_lift =
        (unit_lift_revenue > 0.0).then(|| (params.budget + baseline_revenue) / unit_lift_revenue);

    Ok(PromotionOutcome {
        params: params.clone(),
        baseline: baseline.clone(),
        promo_price,
        unit_cost,
        unit_cost_estimated,
        baseline_revenue,
        promo_revenue,
        incremental_revenue,
        baseline_units,
        promo_units,
        incremental_units,
        promo_orders: baseline.daily_orders * params.lift_multiplier * days,
        baseline_margin,
        promo_margin,
        margin_impact: promo_margin - baseline_margin - params.budget,
        roi_pct,
        true_incremental_revenue: incremental_revenue * (1.0 - CANNIBALIZATION_RATE),
        true_incremental_units: incremental_units * (1.0 - CANNIBALIZATION_RATE),
        break_even_lift,
    })
}

/// Observe the segment's baseline and project `params` against it.
pub fn simulate_segment(
    dataset: &Dataset,
    filter: &SegmentFilter,
    params: &PromotionParams,
) -> Result<PromotionOutcome> {
    params.validate()?;
    simulate(&Baseline::observe(dataset, filter), params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::tests::fixture;
    use crate::model::{City, Scope};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn scenario(budget: f64) -> PromotionOutcome {
        let baseline = Baseline::from_rates(100.0, 50.0, 40.0, None);
        let params = PromotionParams {
            discount_pct: 20.0,
            duration_days: 7,
            lift_multiplier: 1.5,
            budget,
        };
        simulate(&baseline, &params).unwrap()
    }

    #[test]
    fn test_reference_scenario() {
        let outcome = scenario(50_000.0);

        assert!(close(outcome.promo_price, 80.0));
        assert!(close(outcome.baseline_revenue, 35_000.0));
        assert!(close(outcome.promo_revenue, 42_000.0));
        assert!(close(outcome.incremental_revenue, 7_000.0));
        assert!(close(outcome.roi_pct, -86.0));
        assert!(close(outcome.true_incremental_revenue, 5_950.0));

        // 0.55 x 100 fallback cost
        assert!(outcome.unit_cost_estimated);
        assert!(close(outcome.baseline_margin, 350.0 * 45.0));
        assert!(close(outcome.promo_margin, 525.0 * 25.0));
        assert!(close(outcome.margin_impact, 13_125.0 - 15_750.0 - 50_000.0));

        let lift = outcome.break_even_lift.unwrap();
        assert!(close(lift, 85_000.0 / 28_000.0));
    }

    #[test]
    fn test_zero_budget_has_zero_roi() {
        let outcome = scenario(0.0);
        assert_eq!(outcome.roi_pct, 0.0);
        assert!(close(outcome.incremental_revenue, 7_000.0));
    }

    #[test]
    fn test_roi_formula_holds() {
        for budget in [1.0, 2_500.0, 7_000.0, 90_000.0] {
            let o = scenario(budget);
            assert!(close(o.roi_pct, (o.incremental_revenue - budget) / budget * 100.0));
        }
    }

    #[test]
    fn test_parameter_ranges() {
        let baseline = Baseline::from_rates(100.0, 50.0, 40.0, None);
        for params in [
            PromotionParams { discount_pct: 4.0, ..PromotionParams::default() },
            PromotionParams { discount_pct: 51.0, ..PromotionParams::default() },
            PromotionParams { duration_days: 0, ..PromotionParams::default() },
            PromotionParams { duration_days: 31, ..PromotionParams::default() },
            PromotionParams { lift_multiplier: 0.9, ..PromotionParams::default() },
            PromotionParams { budget: -1.0, ..PromotionParams::default() },
        ] {
            assert!(simulate(&baseline, &params).is_err(), "{params:?} should be rejected");
        }
    }

    #[test]
    fn test_observed_baseline() {
        let dataset = fixture();
        let baseline = Baseline::observe(&dataset, &SegmentFilter::default());
        // undated O5 is excluded: 530 revenue, 10 units, 4 orders over 5 days
        assert_eq!(baseline.observed_days, 5);
        assert!(close(baseline.daily_revenue, 106.0));
        assert!(close(baseline.daily_units, 2.0));
        assert!(close(baseline.avg_price, 53.0));
        let cost = baseline.avg_unit_cost.unwrap();
        assert!(close(cost, (5.0 * 40.0 + 5.0 * 60.0) / 10.0));

        let empty = Baseline::observe(
            &dataset,
            &SegmentFilter {
                city: Scope::Only(City::AbuDhabi),
                ..SegmentFilter::default()
            },
        );
        assert_eq!(empty.daily_units, 0.0);
        let outcome = simulate(&empty, &PromotionParams::default()).unwrap();
        assert_eq!(outcome.incremental_revenue, 0.0);
        assert_eq!(outcome.break_even_lift, None);
    }
}
