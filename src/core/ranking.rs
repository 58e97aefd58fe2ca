use super::types::{ComparisonConstraints, ProjectedCountyRecord, RankedCounties};

/// Keeps records from allowed states, preserving their relative order.
pub fn filter_states(
    mut records: Vec<ProjectedCountyRecord>,
    constraints: &ComparisonConstraints,
) -> Vec<ProjectedCountyRecord> {
    if !constraints.include_all_states {
        records.retain(|record| constraints.allows_state(&record.state_abbr));
    }
    records
}

/// Orders by remaining money, highest first, and keeps at most `result_count`.
///
/// The sort is stable, so equal remaining money keeps dataset order.
pub fn rank(mut records: Vec<ProjectedCountyRecord>, result_count: usize) -> RankedCounties {
    let available = records.len();
    records.sort_by(|a, b| b.remaining_money.cmp(&a.remaining_money));
    records.truncate(result_count);
    RankedCounties {
        entries: records,
        available,
        requested: result_count,
        fewer_than_requested: result_count > available,
    }
}
