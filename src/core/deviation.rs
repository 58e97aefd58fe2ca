use super::types::{Category, CountyBudgetRecord, DeviationRatios, UserBudgetInput};

const RATIO_DECIMALS: i32 = 3;

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// `1 + round((user - baseline) / baseline, 3)`, or exactly 1.0 for a zero baseline.
pub fn deviation_ratio(user_value: u64, baseline_value: u64) -> f64 {
    if baseline_value == 0 {
        return 1.0;
    }
    let user = user_value as f64;
    let baseline = baseline_value as f64;
    1.0 + round_to((user - baseline) / baseline, RATIO_DECIMALS)
}

fn zero_baselines(baseline: &CountyBudgetRecord) -> Vec<&'static str> {
    let mut names: Vec<&'static str> = Category::ALL
        .into_iter()
        .filter(|&category| baseline.costs.get(category) == 0)
        .map(Category::label)
        .collect();
    if baseline.median_monthly_family_income == 0 {
        names.push("Income");
    }
    if baseline.total == 0 {
        names.push("Total");
    }
    names
}

impl DeviationRatios {
    /// Ratios of `input` against `baseline`. The total ratio comes from the
    /// category sums, not from the per-category ratios.
    pub fn between(baseline: &CountyBudgetRecord, input: &UserBudgetInput) -> Self {
        for name in zero_baselines(baseline) {
            log::debug!(
                "{} ({}): zero {} baseline, using ratio 1.0",
                baseline.county_state,
                baseline.family_type,
                name
            );
        }

        let ratio_for = |category: Category| {
            deviation_ratio(input.spending.get(category), baseline.costs.get(category))
        };

        Self {
            income: deviation_ratio(input.income, baseline.median_monthly_family_income),
            housing: ratio_for(Category::Housing),
            food: ratio_for(Category::Food),
            transportation: ratio_for(Category::Transportation),
            healthcare: ratio_for(Category::Healthcare),
            childcare: ratio_for(Category::Childcare),
            other_necessities: ratio_for(Category::OtherNecessities),
            taxes: ratio_for(Category::Taxes),
            total: deviation_ratio(input.spending.total(), baseline.total),
        }
    }
}
