//! Descriptive statistics over a joined table (or a persisted one read back).
//! Counts "per case" always mean distinct `case_id` values.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::dataset::table::Table;

pub const CASE_ID_COLUMN: &str = "case_id";
pub const TITLE_COLUMN: &str = "cas_titre_localisation";
pub const CLASSIFICATION_COLUMN: &str = "cas_classification";
pub const DATE_COLUMN: &str = "cas_date_observation";
pub const REGION_COLUMN: &str = "cas_region";
pub const DEPARTMENT_COLUMN: &str = "cas_departement";
/// Observation dates are day/month/year.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

const TOP_REGIONS: usize = 5;
const UNPARSABLE_EXAMPLES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub rows: usize,
    pub columns: usize,
    pub unique_cases: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub testimonies_per_case: Option<PerCaseDistribution>,
    pub cases_per_classification: BTreeMap<String, usize>,
    pub distinct_regions: usize,
    pub top_regions: Vec<RegionCount>,
    pub distinct_departments: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dates: Option<DateCoverage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerCaseDistribution {
    pub min: usize,
    pub mean: f64,
    pub median: f64,
    pub max: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionCount {
    pub region: String,
    pub cases: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateCoverage {
    pub parsed: usize,
    pub unparsable: usize,
    pub unparsable_examples: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earliest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_years: Option<f64>,
    pub cases_per_decade: BTreeMap<i32, usize>,
}

pub fn parse_observation_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

pub fn dataset_stats(table: &Table) -> DatasetStats {
    let case_index = table.column_index(CASE_ID_COLUMN);

    let mut rows_per_case: HashMap<&str, usize> = HashMap::new();
    if let Some(index) = case_index {
        for case_id in table.column(index).flatten() {
            *rows_per_case.entry(case_id).or_default() += 1;
        }
    }

    let cases_per_classification = cases_by_value(table, CLASSIFICATION_COLUMN)
        .into_iter()
        .map(|(value, cases)| (value.to_string(), cases.len()))
        .collect();

    let regions = cases_by_value(table, REGION_COLUMN);
    let mut top_regions: Vec<RegionCount> = regions
        .iter()
        .map(|(region, cases)| RegionCount {
            region: region.to_string(),
            cases: cases.len(),
        })
        .collect();
    top_regions.sort_by(|a, b| b.cases.cmp(&a.cases).then_with(|| a.region.cmp(&b.region)));
    top_regions.truncate(TOP_REGIONS);

    DatasetStats {
        rows: table.len(),
        columns: table.width(),
        unique_cases: rows_per_case.len(),
        testimonies_per_case: distribution(rows_per_case.values().copied().collect()),
        cases_per_classification,
        distinct_regions: regions.len(),
        top_regions,
        distinct_departments: cases_by_value(table, DEPARTMENT_COLUMN).len(),
        dates: date_coverage(table),
    }
}

/// Distinct case ids seen with each non-null value of `column`.
fn cases_by_value<'a>(
    table: &'a Table,
    column: &str,
) -> BTreeMap<&'a str, HashSet<&'a str>> {
    let mut groups: BTreeMap<&str, HashSet<&str>> = BTreeMap::new();
    let Some(value_index) = table.column_index(column) else {
        return groups;
    };
    let case_index = table.column_index(CASE_ID_COLUMN);
    for row in &table.rows {
        let Some(value) = row[value_index].as_deref() else {
            continue;
        };
        let cases = groups.entry(value).or_default();
        if let Some(case_id) = case_index.and_then(|index| row[index].as_deref()) {
            cases.insert(case_id);
        }
    }
    groups
}

fn distribution(mut sizes: Vec<usize>) -> Option<PerCaseDistribution> {
    if sizes.is_empty() {
        return None;
    }
    sizes.sort_unstable();
    let count = sizes.len();
    let mid = count / 2;
    let median = if count % 2 == 0 {
        (sizes[mid - 1] + sizes[mid]) as f64 / 2.0
    } else {
        sizes[mid] as f64
    };
    Some(PerCaseDistribution {
        min: sizes[0],
        mean: sizes.iter().sum::<usize>() as f64 / count as f64,
        median,
        max: sizes[count - 1],
    })
}

fn date_coverage(table: &Table) -> Option<DateCoverage> {
    let date_index = table.column_index(DATE_COLUMN)?;
    let case_index = table.column_index(CASE_ID_COLUMN);

    let mut parsed = 0usize;
    let mut unparsable = 0usize;
    let mut unparsable_examples: Vec<String> = Vec::new();
    let mut earliest: Option<NaiveDate> = None;
    let mut latest: Option<NaiveDate> = None;
    let mut decades: BTreeMap<i32, HashSet<&str>> = BTreeMap::new();

    for row in &table.rows {
        let Some(raw) = row[date_index].as_deref() else {
            continue;
        };
        let Some(date) = parse_observation_date(raw) else {
            unparsable += 1;
            if unparsable_examples.len() < UNPARSABLE_EXAMPLES
                && !unparsable_examples.iter().any(|seen| seen == raw)
            {
                unparsable_examples.push(raw.to_string());
            }
            continue;
        };
        parsed += 1;
        earliest = Some(earliest.map_or(date, |current| current.min(date)));
        latest = Some(latest.map_or(date, |current| current.max(date)));
        let cases = decades.entry(date.year().div_euclid(10) * 10).or_default();
        if let Some(case_id) = case_index.and_then(|index| row[index].as_deref()) {
            cases.insert(case_id);
        }
    }

    let span_years = match (earliest, latest) {
        (Some(first), Some(last)) => Some((last - first).num_days() as f64 / 365.25),
        _ => None,
    };

    Some(DateCoverage {
        parsed,
        unparsable,
        unparsable_examples,
        earliest: earliest.map(|date| date.format(DATE_FORMAT).to_string()),
        latest: latest.map(|date| date.format(DATE_FORMAT).to_string()),
        span_years,
        cases_per_decade: decades
            .into_iter()
            .map(|(decade, cases)| (decade, cases.len()))
            .collect(),
    })
}
