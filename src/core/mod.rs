mod dataset;
mod deviation;
mod engine;
mod error;
mod income;
mod projection;
mod ranking;
mod report;
mod types;

pub use dataset::ReferenceDataset;
pub use deviation::deviation_ratio;
pub use engine::{compute_baseline_budget, compute_deviation, compute_ranking};
pub use error::{CoreError, DatasetError};
pub use income::{IncomeMode, IncomePolicy, ProjectedIncome};
pub use projection::{project_all, project_record};
pub use ranking::{filter_states, rank};
pub use report::{
    ChartBar, ChartSegment, PolicyPhrasing, RankingReport, ReportEntry, ReportLine,
    baseline_report, chart_series, deviation_report, format_currency, format_percent,
};
pub use types::{
    Category, CategoryCosts, ComparisonConstraints, CountyBudgetRecord, DEFAULT_RESULT_COUNT,
    DeviationRatios, FamilyType, MAX_CHILDREN, MAX_PARENTS, ProjectedCountyRecord,
    RankedCounties, StateRanks, UserBudgetInput,
};
