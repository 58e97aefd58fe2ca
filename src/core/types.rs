use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::CoreError;

pub const MAX_PARENTS: u8 = 2;
pub const MAX_CHILDREN: u8 = 4;
pub const DEFAULT_RESULT_COUNT: usize = 5;

/// Household composition key, rendered as `{parents}p{children}c`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FamilyType {
    parents: u8,
    children: u8,
}

impl FamilyType {
    pub fn new(parents: u8, children: u8) -> Result<Self, CoreError> {
        if !(1..=MAX_PARENTS).contains(&parents) || children > MAX_CHILDREN {
            return Err(CoreError::InvalidFamilyType(format!(
                "{parents}p{children}c"
            )));
        }
        Ok(Self { parents, children })
    }

    pub fn all() -> impl Iterator<Item = FamilyType> {
        (1..=MAX_PARENTS)
            .flat_map(|parents| (0..=MAX_CHILDREN).map(move |children| Self { parents, children }))
    }

    pub fn parents(self) -> u8 {
        self.parents
    }

    pub fn children(self) -> u8 {
        self.children
    }

    pub fn has_children(self) -> bool {
        self.children > 0
    }
}

impl fmt::Display for FamilyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p{}c", self.parents, self.children)
    }
}

impl FromStr for FamilyType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidFamilyType(s.to_string());
        let (parents, rest) = s.trim().split_once('p').ok_or_else(invalid)?;
        let children = rest.strip_suffix('c').ok_or_else(invalid)?;
        let count = |digits: &str| {
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            digits.parse::<u8>().map_err(|_| invalid())
        };
        let parents = count(parents)?;
        let children = count(children)?;
        Self::new(parents, children)
    }
}

impl TryFrom<String> for FamilyType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FamilyType> for String {
    fn from(value: FamilyType) -> Self {
        value.to_string()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Category {
    Housing,
    Food,
    Transportation,
    Healthcare,
    Childcare,
    OtherNecessities,
    Taxes,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Housing,
        Category::Food,
        Category::Transportation,
        Category::Healthcare,
        Category::Childcare,
        Category::OtherNecessities,
        Category::Taxes,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Housing => "Housing",
            Category::Food => "Food",
            Category::Transportation => "Transportation",
            Category::Healthcare => "Healthcare",
            Category::Childcare => "Childcare",
            Category::OtherNecessities => "Other necessities",
            Category::Taxes => "Taxes",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCosts {
    pub housing: u64,
    pub food: u64,
    pub transportation: u64,
    pub healthcare: u64,
    pub childcare: u64,
    pub other_necessities: u64,
    pub taxes: u64,
}

impl CategoryCosts {
    pub fn from_fn(mut value_for: impl FnMut(Category) -> u64) -> Self {
        Self {
            housing: value_for(Category::Housing),
            food: value_for(Category::Food),
            transportation: value_for(Category::Transportation),
            healthcare: value_for(Category::Healthcare),
            childcare: value_for(Category::Childcare),
            other_necessities: value_for(Category::OtherNecessities),
            taxes: value_for(Category::Taxes),
        }
    }

    pub fn get(&self, category: Category) -> u64 {
        match category {
            Category::Housing => self.housing,
            Category::Food => self.food,
            Category::Transportation => self.transportation,
            Category::Healthcare => self.healthcare,
            Category::Childcare => self.childcare,
            Category::OtherNecessities => self.other_necessities,
            Category::Taxes => self.taxes,
        }
    }

    /// Saturates at `u64::MAX`; see [`CategoryCosts::checked_total`].
    pub fn total(&self) -> u64 {
        Category::ALL
            .iter()
            .fold(0u64, |sum, &category| sum.saturating_add(self.get(category)))
    }

    pub fn checked_total(&self) -> Option<u64> {
        Category::ALL
            .iter()
            .try_fold(0u64, |sum, &category| sum.checked_add(self.get(category)))
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateRanks {
    pub num_counties_in_state: u32,
    pub cost_rank: u32,
    pub median_affordability_rank: u32,
    pub income_rank: u32,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountyBudgetRecord {
    pub state_abbr: String,
    pub fips: String,
    pub county_name: String,
    pub county_state: String,
    pub family_type: FamilyType,
    #[serde(flatten)]
    pub costs: CategoryCosts,
    pub total: u64,
    pub median_monthly_family_income: u64,
    pub remaining_money: i64,
    pub state_ranks: StateRanks,
}

impl CountyBudgetRecord {
    pub fn new(
        state_abbr: &str,
        fips: &str,
        county_name: &str,
        family_type: FamilyType,
        costs: CategoryCosts,
        median_monthly_family_income: u64,
        state_ranks: StateRanks,
    ) -> Self {
        let total = costs.total();
        Self {
            state_abbr: state_abbr.to_string(),
            fips: fips.to_string(),
            county_name: county_name.to_string(),
            county_state: format!("{county_name}, {state_abbr}"),
            family_type,
            costs,
            total,
            median_monthly_family_income,
            remaining_money: signed_amount(median_monthly_family_income) - signed_amount(total),
            state_ranks,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UserBudgetInput {
    pub county_state: String,
    pub family_type: FamilyType,
    pub income: u64,
    pub spending: CategoryCosts,
}

impl UserBudgetInput {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.spending.checked_total().is_none() {
            return Err(CoreError::InvalidConstraint(
                "spending categories add up to more than the largest supported amount"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ComparisonConstraints {
    pub maintain_income_exact: bool,
    pub enforce_income_cap: bool,
    pub income_cap_amount: Option<u64>,
    pub include_all_states: bool,
    pub allowed_states: BTreeSet<String>,
    pub result_count: usize,
}

impl Default for ComparisonConstraints {
    fn default() -> Self {
        Self {
            maintain_income_exact: false,
            enforce_income_cap: false,
            income_cap_amount: None,
            include_all_states: true,
            allowed_states: BTreeSet::new(),
            result_count: DEFAULT_RESULT_COUNT,
        }
    }
}

impl ComparisonConstraints {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.result_count == 0 {
            return Err(CoreError::InvalidConstraint(
                "result count must be > 0".to_string(),
            ));
        }
        if self.enforce_income_cap && self.income_cap_amount.is_none() {
            return Err(CoreError::InvalidConstraint(
                "income cap amount is required when the income cap is enforced".to_string(),
            ));
        }
        Ok(())
    }

    pub fn allows_state(&self, state_abbr: &str) -> bool {
        self.include_all_states || self.allowed_states.contains(state_abbr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviationRatios {
    pub income: f64,
    pub housing: f64,
    pub food: f64,
    pub transportation: f64,
    pub healthcare: f64,
    pub childcare: f64,
    pub other_necessities: f64,
    pub taxes: f64,
    pub total: f64,
}

impl DeviationRatios {
    pub fn category(&self, category: Category) -> f64 {
        match category {
            Category::Housing => self.housing,
            Category::Food => self.food,
            Category::Transportation => self.transportation,
            Category::Healthcare => self.healthcare,
            Category::Childcare => self.childcare,
            Category::OtherNecessities => self.other_necessities,
            Category::Taxes => self.taxes,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedCountyRecord {
    pub state_abbr: String,
    pub fips: String,
    pub county_name: String,
    pub county_state: String,
    pub family_type: FamilyType,
    #[serde(flatten)]
    pub costs: CategoryCosts,
    pub total: u64,
    pub median_monthly_family_income: u64,
    pub median_monthly_family_income_uncapped: u64,
    pub remaining_money: i64,
    pub state_ranks: StateRanks,
}

impl ProjectedCountyRecord {
    pub fn income_was_capped(&self) -> bool {
        self.median_monthly_family_income_uncapped > self.median_monthly_family_income
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCounties {
    pub entries: Vec<ProjectedCountyRecord>,
    pub available: usize,
    pub requested: usize,
    pub fewer_than_requested: bool,
}

pub(crate) fn signed_amount(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
