use super::error::CoreError;
use super::types::{ComparisonConstraints, DeviationRatios, UserBudgetInput};

/// Where a projected county's income comes from.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum IncomeMode {
    Maintained(u64),
    Recalculated(f64),
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IncomePolicy {
    pub mode: IncomeMode,
    pub cap: Option<u64>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ProjectedIncome {
    pub income: u64,
    pub uncapped: u64,
}

impl IncomePolicy {
    pub fn resolve(
        constraints: &ComparisonConstraints,
        input: &UserBudgetInput,
        ratios: &DeviationRatios,
    ) -> Result<Self, CoreError> {
        let mode = if constraints.maintain_income_exact {
            IncomeMode::Maintained(input.income)
        } else {
            IncomeMode::Recalculated(ratios.income)
        };

        let cap = if constraints.enforce_income_cap {
            let amount = constraints.income_cap_amount.ok_or_else(|| {
                CoreError::InvalidConstraint(
                    "income cap amount is required when the income cap is enforced".to_string(),
                )
            })?;
            Some(amount)
        } else {
            None
        };

        Ok(Self { mode, cap })
    }

    pub fn apply(&self, baseline_income: u64) -> ProjectedIncome {
        let uncapped = match self.mode {
            IncomeMode::Maintained(income) => income,
            IncomeMode::Recalculated(ratio) => (baseline_income as f64 * ratio).round() as u64,
        };
        let income = match self.cap {
            Some(cap) => uncapped.min(cap),
            None => uncapped,
        };
        ProjectedIncome { income, uncapped }
    }
}
