use super::dataset::ReferenceDataset;
use super::error::CoreError;
use super::income::IncomePolicy;
use super::projection::project_all;
use super::ranking::{filter_states, rank};
use super::types::{
    ComparisonConstraints, CountyBudgetRecord, DeviationRatios, FamilyType, RankedCounties,
    UserBudgetInput,
};

pub fn compute_baseline_budget(
    dataset: &ReferenceDataset,
    county_state: &str,
    family_type: FamilyType,
) -> Result<CountyBudgetRecord, CoreError> {
    dataset.baseline(county_state, family_type).cloned()
}

/// Ratios of the user's budget against the baseline for their own county and family type.
pub fn compute_deviation(
    dataset: &ReferenceDataset,
    input: &UserBudgetInput,
) -> Result<DeviationRatios, CoreError> {
    input.validate()?;
    let baseline = dataset.baseline(&input.county_state, input.family_type)?;
    Ok(DeviationRatios::between(baseline, input))
}

/// Ranks every county for the user's family type by projected remaining money.
pub fn compute_ranking(
    dataset: &ReferenceDataset,
    input: &UserBudgetInput,
    constraints: &ComparisonConstraints,
) -> Result<RankedCounties, CoreError> {
    constraints.validate()?;

    let ratios = compute_deviation(dataset, input)?;
    let policy = IncomePolicy::resolve(constraints, input, &ratios)?;
    let projected = project_all(dataset, input.family_type, &ratios, &policy);
    let candidates = filter_states(projected, constraints);
    let ranked = rank(candidates, constraints.result_count);

    log::debug!(
        "Ranked {} of {} candidate counties for {} from {}",
        ranked.entries.len(),
        ranked.available,
        input.family_type,
        input.county_state
    );
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CategoryCosts;
    use std::collections::BTreeSet;

    const FIXTURE: &str = include_str!("../../tests/fixtures/counties.csv");

    fn fixture() -> ReferenceDataset {
        ReferenceDataset::from_reader(FIXTURE.as_bytes(), "counties.csv").expect("valid fixture")
    }

    fn two_parents_one_child() -> FamilyType {
        FamilyType::new(2, 1).expect("valid family")
    }

    fn autauga_input(income: u64) -> UserBudgetInput {
        UserBudgetInput {
            county_state: "Autauga County, AL".to_string(),
            family_type: two_parents_one_child(),
            income,
            spending: CategoryCosts {
                housing: 1_000,
                food: 700,
                transportation: 1_100,
                healthcare: 1_200,
                childcare: 600,
                other_necessities: 500,
                taxes: 500,
            },
        }
    }

    fn labels(ranked: &RankedCounties) -> Vec<&str> {
        ranked
            .entries
            .iter()
            .map(|r| r.county_state.as_str())
            .collect()
    }

    #[test]
    fn baseline_budget_is_returned_unchanged() {
        let dataset = fixture();
        let record = compute_baseline_budget(&dataset, "Travis County, TX", two_parents_one_child())
            .expect("baseline exists");
        assert_eq!(record.total, 6_950);
        assert_eq!(record.median_monthly_family_income, 10_000);
        assert_eq!(record.remaining_money, 3_050);
    }

    #[test]
    fn unknown_county_is_not_found_for_every_operation() {
        let dataset = fixture();
        let mut input = autauga_input(6_000);
        input.county_state = "Nowhere County, ZZ".to_string();

        assert!(matches!(
            compute_baseline_budget(&dataset, &input.county_state, input.family_type),
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(
            compute_deviation(&dataset, &input),
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(
            compute_ranking(&dataset, &input, &ComparisonConstraints::default()),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn baseline_spending_ranks_by_county_baselines() {
        let dataset = fixture();
        let ranked = compute_ranking(&dataset, &autauga_input(6_000), &ComparisonConstraints::default())
            .expect("ranking succeeds");

        // Remaining: OR 10500-7800=2700, TX 10000-6950=3050, AL Autauga 400, AL Washington -500.
        assert_eq!(
            labels(&ranked),
            vec![
                "Travis County, TX",
                "Washington County, OR",
                "Autauga County, AL",
                "Washington County, AL",
            ]
        );
        assert_eq!(ranked.available, 4);
        assert!(ranked.fewer_than_requested);
        assert_eq!(ranked.entries[0].remaining_money, 3_050);
        assert_eq!(ranked.entries[3].remaining_money, -500);
    }

    #[test]
    fn maintained_income_is_identical_in_every_county() {
        let dataset = fixture();
        let constraints = ComparisonConstraints {
            maintain_income_exact: true,
            ..ComparisonConstraints::default()
        };
        let ranked = compute_ranking(&dataset, &autauga_input(5_000), &constraints)
            .expect("ranking succeeds");
        assert!(!ranked.entries.is_empty());
        for record in &ranked.entries {
            assert_eq!(record.median_monthly_family_income, 5_000);
            assert_eq!(record.median_monthly_family_income_uncapped, 5_000);
        }
        // Washington AL has the cheapest baseline and now the most money left.
        assert_eq!(ranked.entries[0].county_state, "Washington County, AL");
    }

    #[test]
    fn doubled_housing_is_reproduced_everywhere() {
        let dataset = fixture();
        let mut input = autauga_input(6_000);
        input.spending.housing = 2_000;

        let ranked = compute_ranking(&dataset, &input, &ComparisonConstraints::default())
            .expect("ranking succeeds");
        let oregon = ranked
            .entries
            .iter()
            .find(|r| r.county_state == "Washington County, OR")
            .expect("OR present");
        assert_eq!(oregon.costs.housing, 3_600);
        assert_eq!(oregon.total, 7_800 + 1_800);
        assert_eq!(oregon.remaining_money, 10_500 - 9_600);
    }

    #[test]
    fn income_cap_limits_projected_income() {
        let dataset = fixture();
        let constraints = ComparisonConstraints {
            enforce_income_cap: true,
            income_cap_amount: Some(7_000),
            ..ComparisonConstraints::default()
        };
        let ranked = compute_ranking(&dataset, &autauga_input(6_000), &constraints)
            .expect("ranking succeeds");
        // The cap erases Travis' income lead: Autauga 400, Travis 50, Washington AL -500, OR -800.
        assert_eq!(
            labels(&ranked),
            vec![
                "Autauga County, AL",
                "Travis County, TX",
                "Washington County, AL",
                "Washington County, OR",
            ]
        );
        let travis = &ranked.entries[1];
        assert_eq!(travis.median_monthly_family_income, 7_000);
        assert_eq!(travis.median_monthly_family_income_uncapped, 10_000);
        assert_eq!(travis.remaining_money, 50);
        for record in &ranked.entries {
            assert!(record.median_monthly_family_income <= 7_000);
        }
    }

    #[test]
    fn state_filter_with_no_matching_counties_is_empty_not_an_error() {
        let dataset = fixture();
        let constraints = ComparisonConstraints {
            include_all_states: false,
            allowed_states: BTreeSet::from(["CA".to_string()]),
            ..ComparisonConstraints::default()
        };
        let ranked = compute_ranking(&dataset, &autauga_input(6_000), &constraints)
            .expect("empty ranking is not an error");
        assert!(ranked.entries.is_empty());
        assert_eq!(ranked.available, 0);
    }

    #[test]
    fn state_filter_counts_available_after_filtering() {
        let dataset = fixture();
        let constraints = ComparisonConstraints {
            include_all_states: false,
            allowed_states: BTreeSet::from(["AL".to_string(), "TX".to_string()]),
            result_count: 5,
            ..ComparisonConstraints::default()
        };
        let ranked = compute_ranking(&dataset, &autauga_input(6_000), &constraints)
            .expect("ranking succeeds");
        assert_eq!(ranked.available, 3);
        assert_eq!(ranked.entries.len(), 3);
        assert!(ranked.fewer_than_requested);
        assert!(ranked.entries.iter().all(|r| r.state_abbr != "OR"));
    }

    #[test]
    fn invalid_constraints_are_rejected_before_lookup() {
        let dataset = fixture();
        let mut input = autauga_input(6_000);
        input.county_state = "Nowhere County, ZZ".to_string();

        let zero_results = ComparisonConstraints {
            result_count: 0,
            ..ComparisonConstraints::default()
        };
        assert!(matches!(
            compute_ranking(&dataset, &input, &zero_results),
            Err(CoreError::InvalidConstraint(_))
        ));

        let cap_without_amount = ComparisonConstraints {
            enforce_income_cap: true,
            income_cap_amount: None,
            ..ComparisonConstraints::default()
        };
        assert!(matches!(
            compute_ranking(&dataset, &input, &cap_without_amount),
            Err(CoreError::InvalidConstraint(_))
        ));
    }

    #[test]
    fn overflowing_spending_is_an_invalid_constraint() {
        let dataset = fixture();
        let mut input = autauga_input(6_000);
        input.spending = CategoryCosts {
            housing: u64::MAX,
            food: 1,
            ..CategoryCosts::default()
        };

        let err = compute_deviation(&dataset, &input).expect_err("sum overflows");
        assert!(matches!(err, CoreError::InvalidConstraint(_)));

        let err = compute_ranking(&dataset, &input, &ComparisonConstraints::default())
            .expect_err("sum overflows");
        assert!(matches!(err, CoreError::InvalidConstraint(_)));
    }

    #[test]
    fn only_matching_family_type_is_ranked() {
        let dataset = fixture();
        let input = UserBudgetInput {
            county_state: "Autauga County, AL".to_string(),
            family_type: FamilyType::new(1, 0).expect("valid family"),
            income: 5_000,
            spending: CategoryCosts {
                housing: 800,
                food: 300,
                transportation: 900,
                healthcare: 400,
                childcare: 0,
                other_necessities: 300,
                taxes: 400,
            },
        };
        let ranked = compute_ranking(&dataset, &input, &ComparisonConstraints::default())
            .expect("ranking succeeds");
        assert_eq!(
            labels(&ranked),
            vec!["Travis County, TX", "Autauga County, AL"]
        );
    }
}
