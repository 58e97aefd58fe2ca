use super::dataset::ReferenceDataset;
use super::income::IncomePolicy;
use super::types::{
    CategoryCosts, CountyBudgetRecord, DeviationRatios, FamilyType, ProjectedCountyRecord,
    signed_amount,
};

fn scale(value: u64, ratio: f64) -> u64 {
    (value as f64 * ratio).round() as u64
}

/// Reproduces the user's spending pattern and income policy on one county's baseline.
pub fn project_record(
    record: &CountyBudgetRecord,
    ratios: &DeviationRatios,
    policy: &IncomePolicy,
) -> ProjectedCountyRecord {
    let costs = CategoryCosts::from_fn(|category| {
        scale(record.costs.get(category), ratios.category(category))
    });
    let total = costs.total();
    let projected_income = policy.apply(record.median_monthly_family_income);

    ProjectedCountyRecord {
        state_abbr: record.state_abbr.clone(),
        fips: record.fips.clone(),
        county_name: record.county_name.clone(),
        county_state: record.county_state.clone(),
        family_type: record.family_type,
        costs,
        total,
        median_monthly_family_income: projected_income.income,
        median_monthly_family_income_uncapped: projected_income.uncapped,
        remaining_money: signed_amount(projected_income.income) - signed_amount(total),
        state_ranks: record.state_ranks,
    }
}

/// Projects every county with `family_type`, in dataset order, before any filtering.
pub fn project_all(
    dataset: &ReferenceDataset,
    family_type: FamilyType,
    ratios: &DeviationRatios,
    policy: &IncomePolicy,
) -> Vec<ProjectedCountyRecord> {
    let projected: Vec<ProjectedCountyRecord> = dataset
        .records_for_family(family_type)
        .map(|record| project_record(record, ratios, policy))
        .collect();
    log::debug!(
        "Projected {} counties for {} families",
        projected.len(),
        family_type
    );
    projected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::income::IncomeMode;
    use crate::core::types::{Category, StateRanks};
    use proptest::prelude::{prop_assert_eq, proptest};

    fn record(costs: CategoryCosts, income: u64) -> CountyBudgetRecord {
        CountyBudgetRecord::new(
            "OR",
            "41067",
            "Washington County",
            FamilyType::new(2, 1).expect("valid family"),
            costs,
            income,
            StateRanks {
                num_counties_in_state: 36,
                cost_rank: 30,
                median_affordability_rank: 2,
                income_rank: 1,
            },
        )
    }

    fn uniform_ratios(ratio: f64) -> DeviationRatios {
        DeviationRatios {
            income: ratio,
            housing: ratio,
            food: ratio,
            transportation: ratio,
            healthcare: ratio,
            childcare: ratio,
            other_necessities: ratio,
            taxes: ratio,
            total: ratio,
        }
    }

    #[test]
    fn scales_each_category_and_resums_total() {
        let costs = CategoryCosts {
            housing: 1_001,
            food: 3,
            transportation: 5,
            healthcare: 7,
            childcare: 0,
            other_necessities: 9,
            taxes: 11,
        };
        let policy = IncomePolicy {
            mode: IncomeMode::Recalculated(1.5),
            cap: None,
        };
        let projected = project_record(&record(costs, 4_000), &uniform_ratios(1.5), &policy);

        // Each of 1.5 * {3, 5, 7, 9, 11} lands on .5 and rounds up.
        assert_eq!(projected.costs.housing, 1_502);
        assert_eq!(projected.costs.food, 5);
        assert_eq!(projected.costs.transportation, 8);
        assert_eq!(projected.costs.healthcare, 11);
        assert_eq!(projected.costs.childcare, 0);
        assert_eq!(projected.costs.other_necessities, 14);
        assert_eq!(projected.costs.taxes, 17);
        assert_eq!(projected.total, 1_502 + 5 + 8 + 11 + 14 + 17);
        assert_eq!(projected.median_monthly_family_income, 6_000);
        assert_eq!(projected.remaining_money, 6_000 - 1_557);
        assert_eq!(projected.state_ranks.income_rank, 1);
        assert_eq!(projected.county_state, "Washington County, OR");
    }

    #[test]
    fn remaining_money_can_go_negative() {
        let costs = CategoryCosts {
            housing: 3_000,
            ..CategoryCosts::default()
        };
        let policy = IncomePolicy {
            mode: IncomeMode::Maintained(1_000),
            cap: None,
        };
        let projected = project_record(&record(costs, 9_000), &uniform_ratios(1.0), &policy);
        assert_eq!(projected.remaining_money, -2_000);
    }

    #[test]
    fn remaining_money_uses_capped_income() {
        let costs = CategoryCosts {
            housing: 2_000,
            ..CategoryCosts::default()
        };
        let policy = IncomePolicy {
            mode: IncomeMode::Recalculated(1.0),
            cap: Some(5_000),
        };
        let projected = project_record(&record(costs, 8_000), &uniform_ratios(1.0), &policy);
        assert_eq!(projected.median_monthly_family_income, 5_000);
        assert_eq!(projected.median_monthly_family_income_uncapped, 8_000);
        assert!(projected.income_was_capped());
        assert_eq!(projected.remaining_money, 3_000);
    }

    proptest! {
        #[test]
        fn prop_total_and_remaining_invariants_hold(
            values in proptest::array::uniform7(0u64..20_000),
            ratio_thousandths in proptest::array::uniform7(0u32..3_000),
            income in 0u64..30_000,
            income_ratio_thousandths in 0u32..3_000,
            cap in proptest::option::of(0u64..30_000),
        ) {
            let costs = CategoryCosts::from_fn(|category| {
                let position = Category::ALL.iter().position(|&c| c == category).unwrap_or(0);
                values[position]
            });
            let ratio = |i: usize| f64::from(ratio_thousandths[i]) / 1000.0;
            let ratios = DeviationRatios {
                income: f64::from(income_ratio_thousandths) / 1000.0,
                housing: ratio(0),
                food: ratio(1),
                transportation: ratio(2),
                healthcare: ratio(3),
                childcare: ratio(4),
                other_necessities: ratio(5),
                taxes: ratio(6),
                total: 1.0,
            };
            let policy = IncomePolicy {
                mode: IncomeMode::Recalculated(ratios.income),
                cap,
            };
            let projected = project_record(&record(costs, income), &ratios, &policy);

            prop_assert_eq!(projected.total, projected.costs.total());
            prop_assert_eq!(
                projected.remaining_money,
                projected.median_monthly_family_income as i64 - projected.total as i64
            );
        }
    }
}
