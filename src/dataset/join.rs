//! Left join of testimonies onto cases.
//!
//! Output layout: `case_id`, then every case column as `cas_<name>`, then the
//! remaining testimony columns, each group in its original order.

use std::collections::HashMap;

use serde::Serialize;

use crate::dataset::cases::{CaseRecord, CaseTable, CASE_COLUMNS};
use crate::dataset::integrity::{raise, IntegrityWarning};
use crate::dataset::table::{Cell, Table};
use crate::dataset::testimonies::JOIN_KEY;

pub const CASE_PREFIX: &str = "cas_";
/// Appended to a testimony column whose name clashes with a prefixed case column.
const CLASH_SUFFIX: &str = "_temoignage";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinReport {
    pub testimonies_in: usize,
    pub cases_available: usize,
    pub residual_duplicate_ids: usize,
    pub unmatched_testimonies: usize,
    pub rows_after_join: usize,
    pub fan_out_rows: usize,
    pub duplicates_removed: usize,
    pub rows_out: usize,
    pub warnings: Vec<IntegrityWarning>,
}

pub fn case_column_name(column: &str) -> String {
    format!("{CASE_PREFIX}{column}")
}

/// Join `testimonies` (first column is the join key) against `cases`.
///
/// Every testimony yields one row per matching case: normally one, more only
/// when `cases` still repeats a `case_id`, which is reported but not rejected.
/// Testimonies without a case keep all `cas_*` fields empty.
pub fn join(cases: &CaseTable, testimonies: &Table) -> (Table, JoinReport) {
    let mut warnings = Vec::new();
    let testimonies_in = testimonies.len();

    let residual_duplicate_ids = cases.duplicate_ids();
    if residual_duplicate_ids > 0 {
        raise(
            &mut warnings,
            IntegrityWarning::ResidualDuplicateCaseIds {
                count: residual_duplicate_ids,
            },
        );
    }

    let mut by_id: HashMap<&str, Vec<&CaseRecord>> = HashMap::with_capacity(cases.len());
    for record in &cases.records {
        by_id.entry(record.case_id.as_str()).or_default().push(record);
    }

    let case_columns: Vec<String> = CASE_COLUMNS[1..]
        .iter()
        .map(|column| case_column_name(column))
        .collect();
    let mut columns = Vec::with_capacity(1 + case_columns.len() + testimonies.width());
    columns.push(JOIN_KEY.to_string());
    columns.extend(case_columns.iter().cloned());
    for name in testimonies.columns.iter().skip(1) {
        if case_columns.contains(name) {
            columns.push(format!("{name}{CLASH_SUFFIX}"));
        } else {
            columns.push(name.clone());
        }
    }
    let mut joined = Table::new(columns);

    let empty_case: Vec<Cell> = vec![None; case_columns.len()];
    let mut unmatched_testimonies = 0usize;
    for testimony in &testimonies.rows {
        let key = testimony.first().cloned().flatten();
        let matches = key.as_deref().and_then(|key| by_id.get(key));
        match matches {
            Some(records) => {
                for record in records {
                    let attributes = record
                        .attributes()
                        .into_iter()
                        .map(|value| value.map(str::to_string))
                        .collect();
                    joined.rows.push(assemble(&key, attributes, testimony));
                }
            }
            None => {
                unmatched_testimonies += 1;
                joined
                    .rows
                    .push(assemble(&key, empty_case.clone(), testimony));
            }
        }
    }

    let rows_after_join = joined.len();
    tracing::info!(
        testimonies = testimonies_in,
        cases = cases.len(),
        rows = rows_after_join,
        "testimonies joined to cases"
    );

    if unmatched_testimonies > 0 {
        raise(
            &mut warnings,
            IntegrityWarning::UnmatchedTestimonies {
                count: unmatched_testimonies,
            },
        );
    }
    let fan_out_rows = rows_after_join.saturating_sub(testimonies_in);
    if fan_out_rows > 0 {
        raise(
            &mut warnings,
            IntegrityWarning::JoinFanOut {
                extra_rows: fan_out_rows,
            },
        );
    }

    let duplicates_removed = joined.remove_duplicate_rows();
    if duplicates_removed > 0 {
        raise(
            &mut warnings,
            IntegrityWarning::DuplicateJoinedRows {
                removed: duplicates_removed,
            },
        );
    }

    let report = JoinReport {
        testimonies_in,
        cases_available: cases.len(),
        residual_duplicate_ids,
        unmatched_testimonies,
        rows_after_join,
        fan_out_rows,
        duplicates_removed,
        rows_out: joined.len(),
        warnings,
    };
    (joined, report)
}

fn assemble(key: &Cell, case_fields: Vec<Cell>, testimony: &[Cell]) -> Vec<Cell> {
    let mut row = Vec::with_capacity(1 + case_fields.len() + testimony.len());
    row.push(key.clone());
    row.extend(case_fields);
    row.extend(testimony.iter().skip(1).cloned());
    row
}
