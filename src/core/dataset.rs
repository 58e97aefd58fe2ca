use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::error::{CoreError, DatasetError};
use super::types::{CategoryCosts, CountyBudgetRecord, FamilyType, StateRanks};

const FIPS_WIDTH: usize = 5;
const MONTHS_PER_YEAR: f64 = 12.0;

#[derive(Debug, Deserialize)]
struct DatasetRow {
    state_abbr: String,
    fips: String,
    county: String,
    family_type: String,
    housing: u64,
    food: u64,
    transportation: u64,
    healthcare: u64,
    other_necessities: u64,
    childcare: u64,
    taxes: u64,
    total: Option<u64>,
    median_family_income: f64,
    num_counties_in_st: u32,
    st_cost_rank: u32,
    st_med_aff_rank: u32,
    st_income_rank: u32,
}

/// Immutable per-county baselines, keyed by (county label, family type).
#[derive(Debug)]
pub struct ReferenceDataset {
    records: Vec<CountyBudgetRecord>,
    index: HashMap<(String, FamilyType), usize>,
}

impl ReferenceDataset {
    pub fn from_records(records: Vec<CountyBudgetRecord>) -> Result<Self, DatasetError> {
        let mut index = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            let key = (record.county_state.clone(), record.family_type);
            if index.insert(key, position).is_some() {
                return Err(DatasetError::DuplicateKey {
                    county_state: record.county_state.clone(),
                    family_type: record.family_type,
                });
            }
        }
        Ok(Self { records, index })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DatasetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let dataset = Self::from_reader(file, &path.display().to_string())?;
        log::info!(
            "Loaded {} county budget records from {}",
            dataset.len(),
            path.display()
        );
        Ok(dataset)
    }

    /// Parses CSV rows from `reader`; `source` names the input in errors.
    pub fn from_reader(reader: impl Read, source: &str) -> Result<Self, DatasetError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut records = Vec::new();
        for (position, result) in csv_reader.deserialize::<DatasetRow>().enumerate() {
            let row = result.map_err(|e| DatasetError::Csv {
                path: source.to_string(),
                source: e,
            })?;
            // Header occupies line 1.
            let line = position as u64 + 2;
            records.push(record_from_row(row).map_err(|message| {
                DatasetError::InvalidRecord {
                    path: source.to_string(),
                    line,
                    message,
                }
            })?);
        }

        Self::from_records(records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CountyBudgetRecord] {
        &self.records
    }

    pub fn get(&self, county_state: &str, family_type: FamilyType) -> Option<&CountyBudgetRecord> {
        self.index
            .get(&(county_state.to_string(), family_type))
            .map(|&position| &self.records[position])
    }

    pub fn baseline(
        &self,
        county_state: &str,
        family_type: FamilyType,
    ) -> Result<&CountyBudgetRecord, CoreError> {
        self.get(county_state, family_type)
            .ok_or_else(|| CoreError::NotFound {
                county_state: county_state.to_string(),
                family_type,
            })
    }

    pub fn records_for_family(
        &self,
        family_type: FamilyType,
    ) -> impl Iterator<Item = &CountyBudgetRecord> {
        self.records
            .iter()
            .filter(move |record| record.family_type == family_type)
    }

    pub fn county_states(&self) -> Vec<&str> {
        unique_in_order(self.records.iter().map(|r| r.county_state.as_str()))
    }

    pub fn states(&self) -> Vec<&str> {
        unique_in_order(self.records.iter().map(|r| r.state_abbr.as_str()))
    }
}

fn unique_in_order<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    values.filter(|value| seen.insert(*value)).collect()
}

fn record_from_row(row: DatasetRow) -> Result<CountyBudgetRecord, String> {
    let family_type = row
        .family_type
        .parse::<FamilyType>()
        .map_err(|e| e.to_string())?;

    if !row.median_family_income.is_finite() || row.median_family_income < 0.0 {
        return Err(format!(
            "median_family_income must be a non-negative number, got {}",
            row.median_family_income
        ));
    }
    if row.state_abbr.len() != 2 {
        return Err(format!(
            "state_abbr must be a two-letter code, got {:?}",
            row.state_abbr
        ));
    }

    let costs = CategoryCosts {
        housing: row.housing,
        food: row.food,
        transportation: row.transportation,
        healthcare: row.healthcare,
        childcare: row.childcare,
        other_necessities: row.other_necessities,
        taxes: row.taxes,
    };
    let monthly_income = (row.median_family_income / MONTHS_PER_YEAR).round() as u64;
    let fips = format!("{:0>width$}", row.fips, width = FIPS_WIDTH);

    let record = CountyBudgetRecord::new(
        &row.state_abbr,
        &fips,
        &row.county,
        family_type,
        costs,
        monthly_income,
        StateRanks {
            num_counties_in_state: row.num_counties_in_st,
            cost_rank: row.st_cost_rank,
            median_affordability_rank: row.st_med_aff_rank,
            income_rank: row.st_income_rank,
        },
    );

    if let Some(source_total) = row.total
        && source_total != record.total
    {
        log::warn!(
            "{} ({}): source total {} does not match category sum {}, using the sum",
            record.county_state,
            family_type,
            source_total,
            record.total
        );
    }

    Ok(record)
}
