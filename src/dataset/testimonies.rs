//! Testimony export loader: one row per witness account, variable width.

use std::path::Path;

use serde::Serialize;

use crate::dataset::integrity::{raise, IntegrityWarning};
use crate::dataset::table::{non_empty, normalize_headers, read_headed_records, Table};
use crate::error::Result;

/// Name given to the first column, whatever the export calls it.
pub const JOIN_KEY: &str = "case_id";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestimonyLoadReport {
    pub source_path: String,
    pub rows_read: usize,
    pub columns_read: usize,
    pub duplicates_removed: usize,
    pub dropped_columns: Vec<String>,
    pub columns_remaining: usize,
    pub testimonies_loaded: usize,
    pub warnings: Vec<IntegrityWarning>,
}

/// Load the testimony table. The first column becomes [`JOIN_KEY`]. Columns
/// filled in no more than `sparse_threshold` of the rows are dropped; the join
/// key is always kept.
pub fn load_testimonies(
    path: &Path,
    sparse_threshold: f64,
) -> Result<(Table, TestimonyLoadReport)> {
    let (mut columns, mut raw_rows) = read_headed_records(path)?;
    let rows_read = raw_rows.len();
    let columns_read = columns.len();
    tracing::debug!(path = %path.display(), rows_read, columns_read, "testimony file read");

    // Renaming can collide with a later column already called `case_id`.
    columns[0] = JOIN_KEY.to_string();
    let columns = normalize_headers(columns.iter().map(String::as_str));
    for row in &mut raw_rows {
        let trimmed = row[0].trim();
        if trimmed.len() != row[0].len() {
            row[0] = trimmed.to_string();
        }
    }

    let mut table = Table {
        columns,
        rows: raw_rows
            .into_iter()
            .map(|row| row.into_iter().map(Some).collect())
            .collect(),
    };
    // Duplicates are judged on the raw text, before trimming or nulling.
    let duplicates_removed = table.remove_duplicate_rows();

    // Only truly empty fields count as missing for the occupancy ratio;
    // whitespace-only values are trimmed away after pruning.
    for row in &mut table.rows {
        for cell in row.iter_mut() {
            if cell.as_deref().is_some_and(str::is_empty) {
                *cell = None;
            }
        }
    }

    let dropped_columns = prune_sparse_columns(&mut table, sparse_threshold);

    for row in &mut table.rows {
        for cell in row.iter_mut() {
            *cell = cell.as_deref().and_then(non_empty);
        }
    }

    let mut warnings = Vec::new();
    if duplicates_removed > 0 {
        raise(
            &mut warnings,
            IntegrityWarning::DuplicateTestimonies {
                removed: duplicates_removed,
            },
        );
    }
    if !dropped_columns.is_empty() {
        raise(
            &mut warnings,
            IntegrityWarning::SparseColumnsDropped {
                dropped: dropped_columns.len(),
                remaining: table.width(),
            },
        );
    }

    tracing::info!(
        path = %path.display(),
        rows_read,
        testimonies = table.len(),
        columns = table.width(),
        "testimony table loaded"
    );

    let report = TestimonyLoadReport {
        source_path: path.display().to_string(),
        rows_read,
        columns_read,
        duplicates_removed,
        dropped_columns,
        columns_remaining: table.width(),
        testimonies_loaded: table.len(),
        warnings,
    };
    Ok((table, report))
}

/// Drop every column (other than the join key) whose non-null count is not
/// strictly above `threshold * rows`. Returns the dropped names.
pub fn prune_sparse_columns(table: &mut Table, threshold: f64) -> Vec<String> {
    let minimum = table.len() as f64 * threshold;
    let keep: Vec<bool> = (0..table.width())
        .map(|index| index == 0 || table.non_null_count(index) as f64 > minimum)
        .collect();
    let dropped = table
        .columns
        .iter()
        .zip(&keep)
        .filter(|(_, keep)| !**keep)
        .map(|(name, _)| name.clone())
        .collect();
    table.retain_columns(&keep);
    dropped
}
