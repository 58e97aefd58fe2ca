use serde::Serialize;

use super::types::{
    Category, ComparisonConstraints, CountyBudgetRecord, DeviationRatios, FamilyType,
    ProjectedCountyRecord, RankedCounties, signed_amount,
};

const NO_MATCHES: &str = "No counties match the selected constraints.";
const LINE_INDENT: &str = "    ";

/// Renders `$1,234`, or `-$1,234` for negative amounts.
pub fn format_currency(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

pub fn format_percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

fn pluralize<'a>(count: u8, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}

pub fn baseline_report(record: &CountyBudgetRecord) -> String {
    let family = record.family_type;
    let mut lines = vec![
        format!(
            "Moderately frugal families of {} {} and {} {} living in {} tend to have a monthly family budget similar to the following:",
            family.parents(),
            pluralize(family.parents(), "adult", "adults"),
            family.children(),
            pluralize(family.children(), "child", "children"),
            record.county_state
        ),
        String::new(),
    ];
    for category in Category::ALL {
        lines.push(format!(
            "{}: {}",
            category.label(),
            format_currency(signed_amount(record.costs.get(category)))
        ));
    }
    lines.push(format!("Total: {}", format_currency(signed_amount(record.total))));
    lines.push(String::new());
    lines.push(format!(
        "The median monthly family income for {} is {}, which would leave {} each month for emergencies, saving, and discretionary spending.",
        record.county_state,
        format_currency(signed_amount(record.median_monthly_family_income)),
        format_currency(record.remaining_money)
    ));
    lines.join("\n")
}

pub fn deviation_report(ratios: &DeviationRatios, family_type: FamilyType) -> String {
    let mut lines = vec![
        format!(
            "Your family's income is {} that of the median family income in your area. Your budget compares to the typical model as follows:",
            format_percent(ratios.income)
        ),
        String::new(),
    ];
    for category in Category::ALL {
        let value = if category == Category::Childcare && !family_type.has_children() {
            "N/A".to_string()
        } else {
            format_percent(ratios.category(category))
        };
        lines.push(format!("{}: {value}", category.label()));
    }
    lines.push(format!("Total: {}", format_percent(ratios.total)));
    lines.join("\n")
}

/// Which income handling the ranking preamble describes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PolicyPhrasing {
    RecalculatedBoth,
    IncomeMaintained,
    CappedBoth { cap: u64 },
}

impl PolicyPhrasing {
    pub fn from_constraints(constraints: &ComparisonConstraints) -> Self {
        if constraints.maintain_income_exact {
            PolicyPhrasing::IncomeMaintained
        } else if constraints.enforce_income_cap {
            PolicyPhrasing::CappedBoth {
                cap: constraints.income_cap_amount.unwrap_or(0),
            }
        } else {
            PolicyPhrasing::RecalculatedBoth
        }
    }

    fn opening(self) -> String {
        match self {
            PolicyPhrasing::RecalculatedBoth => {
                "With both your spending and income recalculated based on each county's norm, "
                    .to_string()
            }
            PolicyPhrasing::IncomeMaintained => {
                "With your exact income maintained but your spending recalculated based on each county's norm, "
                    .to_string()
            }
            PolicyPhrasing::CappedBoth { cap } => format!(
                "With both your spending and income recalculated based on each county's norm (and an income cap of {}), ",
                format_currency(signed_amount(cap))
            ),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLine {
    pub label: &'static str,
    pub amount: i64,
    pub uncapped: Option<i64>,
}

impl ReportLine {
    fn new(label: &'static str, amount: i64) -> Self {
        Self {
            label,
            amount,
            uncapped: None,
        }
    }

    fn render(&self) -> String {
        match self.uncapped {
            Some(uncapped) => format!(
                "{LINE_INDENT}{}: {} (Uncapped: {})",
                self.label,
                format_currency(self.amount),
                format_currency(uncapped)
            ),
            None => format!(
                "{LINE_INDENT}{}: {}",
                self.label,
                format_currency(self.amount)
            ),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub rank: usize,
    pub county_state: String,
    pub lines: Vec<ReportLine>,
}

impl ReportEntry {
    fn from_record(rank: usize, record: &ProjectedCountyRecord, cap_enforced: bool) -> Self {
        let mut lines: Vec<ReportLine> = Category::ALL
            .iter()
            .map(|&category| {
                ReportLine::new(category.label(), signed_amount(record.costs.get(category)))
            })
            .collect();
        lines.push(ReportLine::new("Total", signed_amount(record.total)));
        lines.push(ReportLine {
            label: "Income",
            amount: signed_amount(record.median_monthly_family_income),
            uncapped: (cap_enforced && record.income_was_capped())
                .then(|| signed_amount(record.median_monthly_family_income_uncapped)),
        });
        lines.push(ReportLine::new("Remaining money", record.remaining_money));

        Self {
            rank,
            county_state: record.county_state.clone(),
            lines,
        }
    }

    fn render(&self) -> String {
        let mut out = vec![format!("#{}", self.rank), self.county_state.clone()];
        out.extend(self.lines.iter().map(ReportLine::render));
        out.join("\n")
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingReport {
    pub phrasing: PolicyPhrasing,
    pub notice: Option<String>,
    pub preamble: Option<String>,
    pub entries: Vec<ReportEntry>,
}

impl RankingReport {
    pub fn build(ranked: &RankedCounties, constraints: &ComparisonConstraints) -> Self {
        let phrasing = PolicyPhrasing::from_constraints(constraints);

        if ranked.entries.is_empty() {
            return Self {
                phrasing,
                notice: Some(NO_MATCHES.to_string()),
                preamble: None,
                entries: Vec::new(),
            };
        }

        let shown = ranked.entries.len();
        let notice = ranked.fewer_than_requested.then(|| {
            if shown == 1 {
                "There is only 1 county to show!".to_string()
            } else {
                format!("There are only {shown} counties to show!")
            }
        });
        let closing = if shown == 1 {
            "here is the most affordable county for your family, along with what your budget might look like living there:".to_string()
        } else {
            format!(
                "here are the {shown} most affordable counties for your family, along with what your budget might look like living there:"
            )
        };

        let entries = ranked
            .entries
            .iter()
            .enumerate()
            .map(|(i, record)| {
                ReportEntry::from_record(i + 1, record, constraints.enforce_income_cap)
            })
            .collect();

        Self {
            phrasing,
            notice,
            preamble: Some(format!("{}{closing}", phrasing.opening())),
            entries,
        }
    }

    pub fn render(&self) -> String {
        let mut sections: Vec<String> = Vec::new();
        sections.extend(self.notice.iter().cloned());
        sections.extend(self.preamble.iter().cloned());
        sections.extend(self.entries.iter().map(ReportEntry::render));
        sections.join("\n\n")
    }
}

/// One bar of the ranking chart; segments follow the stacking order.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartBar {
    pub county_state: String,
    pub segments: Vec<ChartSegment>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSegment {
    pub label: &'static str,
    pub amount: i64,
}

pub fn chart_series(ranked: &RankedCounties) -> Vec<ChartBar> {
    ranked
        .entries
        .iter()
        .map(|record| {
            let mut segments = vec![ChartSegment {
                label: "Remaining Money",
                amount: record.remaining_money,
            }];
            segments.extend(Category::ALL.iter().map(|&category| ChartSegment {
                label: match category {
                    Category::OtherNecessities => "Other",
                    other => other.label(),
                },
                amount: signed_amount(record.costs.get(category)),
            }));
            ChartBar {
                county_state: record.county_state.clone(),
                segments,
            }
        })
        .collect()
}
