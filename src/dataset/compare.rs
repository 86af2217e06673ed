//! Automated output versus a hand-corrected copy of it.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use crate::dataset::stats::{CASE_ID_COLUMN, CLASSIFICATION_COLUMN, DATE_COLUMN, TITLE_COLUMN};
use crate::dataset::table::{read_table, Table};
use crate::error::{ensure_exists, GeipanError, Result};

pub const CRITICAL_COLUMNS: [&str; 4] =
    [CASE_ID_COLUMN, TITLE_COLUMN, DATE_COLUMN, CLASSIFICATION_COLUMN];

const DETAILED_COLUMNS: usize = 10;
const EXAMPLES_PER_COLUMN: usize = 3;
const EXAMPLE_CHARS: usize = 60;
const HTML_NEEDLE: &str = "<br";

/// One measurement taken on both files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pair<T> {
    pub automated: T,
    pub manual: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileShape {
    pub path: String,
    pub bytes: u64,
    pub rows: usize,
    pub columns: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingValues {
    pub column: String,
    /// `None` when the file lacks the column.
    pub counts: Pair<Option<usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellDifference {
    pub row: usize,
    pub automated: String,
    pub manual: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDifference {
    pub column: String,
    pub changed_cells: usize,
    pub percent: f64,
    pub examples: Vec<CellDifference>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Automated,
    Manual,
    Tie,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub files: Pair<FileShape>,
    pub same_shape: bool,
    pub identical_column_order: bool,
    pub common_columns: usize,
    pub only_in_automated: Vec<String>,
    pub only_in_manual: Vec<String>,
    pub duplicate_rows: Pair<usize>,
    pub duplicate_case_ids: Pair<Option<usize>>,
    pub html_tags: Pair<usize>,
    pub missing_critical: Vec<MissingValues>,
    pub identical: bool,
    /// Columns with changed cells, most changed first. Only filled when both
    /// files have the same number of rows.
    pub differing_columns: usize,
    pub column_differences: Vec<ColumnDifference>,
    pub score: Pair<u8>,
    pub verdict: Verdict,
}

pub fn compare_datasets(automated: &Path, manual: &Path) -> Result<ComparisonReport> {
    let auto_table = load(automated)?;
    let manual_table = load(manual)?;
    let files = Pair {
        automated: shape(automated, &auto_table)?,
        manual: shape(manual, &manual_table)?,
    };
    let report = compare_tables(&auto_table, &manual_table, files);
    tracing::info!(
        automated = %automated.display(),
        manual = %manual.display(),
        verdict = ?report.verdict,
        "datasets compared"
    );
    Ok(report)
}

fn load(path: &Path) -> Result<Table> {
    ensure_exists(path)?;
    read_table(path)
}

fn shape(path: &Path, table: &Table) -> Result<FileShape> {
    let bytes = std::fs::metadata(path)
        .map_err(|err| GeipanError::io(path, err))?
        .len();
    Ok(FileShape {
        path: path.display().to_string(),
        bytes,
        rows: table.len(),
        columns: table.width(),
    })
}

pub fn compare_tables(auto: &Table, manual: &Table, files: Pair<FileShape>) -> ComparisonReport {
    let auto_columns: HashSet<&String> = auto.columns.iter().collect();
    let manual_columns: HashSet<&String> = manual.columns.iter().collect();
    let only_in_automated: Vec<String> = auto
        .columns
        .iter()
        .filter(|column| !manual_columns.contains(column))
        .cloned()
        .collect();
    let only_in_manual: Vec<String> = manual
        .columns
        .iter()
        .filter(|column| !auto_columns.contains(column))
        .cloned()
        .collect();

    let duplicate_rows = Pair {
        automated: auto.duplicate_row_count(),
        manual: manual.duplicate_row_count(),
    };
    let html_tags = Pair {
        automated: html_cells(auto),
        manual: html_cells(manual),
    };
    let duplicate_case_ids = Pair {
        automated: auto
            .column_index(CASE_ID_COLUMN)
            .map(|index| auto.duplicate_values(index)),
        manual: manual
            .column_index(CASE_ID_COLUMN)
            .map(|index| manual.duplicate_values(index)),
    };
    let missing_critical = CRITICAL_COLUMNS
        .iter()
        .map(|column| MissingValues {
            column: column.to_string(),
            counts: Pair {
                automated: missing(auto, column),
                manual: missing(manual, column),
            },
        })
        .collect();

    let mut column_differences = Vec::new();
    if auto.len() == manual.len() {
        for (auto_index, column) in auto.columns.iter().enumerate() {
            let Some(manual_index) = manual.column_index(column) else {
                continue;
            };
            if let Some(diff) = diff_column(auto, auto_index, manual, manual_index, column) {
                column_differences.push(diff);
            }
        }
    }
    column_differences.sort_by(|a, b| b.changed_cells.cmp(&a.changed_cells));
    let differing_columns = column_differences.len();
    column_differences.truncate(DETAILED_COLUMNS);

    let mut score = Pair {
        automated: 0u8,
        manual: 0u8,
    };
    award(&mut score, duplicate_rows.automated, duplicate_rows.manual);
    award(&mut score, html_tags.automated, html_tags.manual);
    // More rows is better here, so the comparison is reversed.
    award(&mut score, manual.len(), auto.len());
    let verdict = match score.automated.cmp(&score.manual) {
        std::cmp::Ordering::Greater => Verdict::Automated,
        std::cmp::Ordering::Less => Verdict::Manual,
        std::cmp::Ordering::Equal => Verdict::Tie,
    };

    ComparisonReport {
        same_shape: auto.len() == manual.len() && auto.width() == manual.width(),
        identical_column_order: auto.columns == manual.columns,
        common_columns: auto_columns.intersection(&manual_columns).count(),
        only_in_automated,
        only_in_manual,
        duplicate_rows,
        duplicate_case_ids,
        html_tags,
        missing_critical,
        identical: auto == manual,
        differing_columns,
        column_differences,
        score,
        verdict,
        files,
    }
}

/// The side with the smaller count gets a point.
fn award(score: &mut Pair<u8>, automated: usize, manual: usize) {
    if automated < manual {
        score.automated += 1;
    } else if manual < automated {
        score.manual += 1;
    }
}

fn html_cells(table: &Table) -> usize {
    table
        .rows
        .iter()
        .flatten()
        .flatten()
        .filter(|value| value.contains(HTML_NEEDLE))
        .count()
}

fn missing(table: &Table, column: &str) -> Option<usize> {
    let index = table.column_index(column)?;
    Some(table.len() - table.non_null_count(index))
}

fn diff_column(
    auto: &Table,
    auto_index: usize,
    manual: &Table,
    manual_index: usize,
    column: &str,
) -> Option<ColumnDifference> {
    let mut changed_cells = 0usize;
    let mut examples = Vec::new();
    for (row, (left, right)) in auto
        .column(auto_index)
        .zip(manual.column(manual_index))
        .enumerate()
    {
        let left = left.unwrap_or("");
        let right = right.unwrap_or("");
        if left == right {
            continue;
        }
        changed_cells += 1;
        if examples.len() < EXAMPLES_PER_COLUMN {
            examples.push(CellDifference {
                row,
                automated: left.chars().take(EXAMPLE_CHARS).collect(),
                manual: right.chars().take(EXAMPLE_CHARS).collect(),
            });
        }
    }
    (changed_cells > 0).then(|| ColumnDifference {
        column: column.to_string(),
        changed_cells,
        percent: changed_cells as f64 * 100.0 / auto.len() as f64,
        examples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
                        .collect()
                })
                .collect(),
        }
    }

    fn files() -> Pair<FileShape> {
        let shape = FileShape {
            path: String::new(),
            bytes: 0,
            rows: 0,
            columns: 0,
        };
        Pair {
            automated: shape.clone(),
            manual: shape,
        }
    }

    #[test]
    fn identical_tables_tie() {
        let auto = table(&["case_id", "cas_titre_localisation"], &[&["C1", "a"]]);
        let report = compare_tables(&auto, &auto.clone(), files());
        assert!(report.identical);
        assert!(report.identical_column_order);
        assert_eq!(report.differing_columns, 0);
        assert_eq!(report.verdict, Verdict::Tie);
    }

    #[test]
    fn renamed_columns_are_listed_per_side() {
        let auto = table(&["case_id", "1937309697"], &[&["C1", "x"]]);
        let manual = table(&["case_id", "temoin_id"], &[&["C1", "x"]]);
        let report = compare_tables(&auto, &manual, files());
        assert_eq!(report.only_in_automated, vec!["1937309697"]);
        assert_eq!(report.only_in_manual, vec!["temoin_id"]);
        assert_eq!(report.common_columns, 1);
        assert!(report.same_shape);
        assert!(!report.identical);
    }

    #[test]
    fn cell_changes_are_counted_most_changed_first() {
        let auto = table(
            &["case_id", "a", "b"],
            &[&["C1", "x<br>", "1"], &["C2", "y", "2"], &["C3", "z", "3"]],
        );
        let manual = table(
            &["case_id", "a", "b"],
            &[&["C1", "x", "1"], &["C2", "Y", "2"], &["C3", "z", "4"]],
        );
        let report = compare_tables(&auto, &manual, files());
        assert_eq!(report.differing_columns, 2);
        assert_eq!(report.column_differences[0].column, "a");
        assert_eq!(report.column_differences[0].changed_cells, 2);
        assert_eq!(report.column_differences[0].examples[0].row, 0);
        assert_eq!(report.html_tags, Pair { automated: 1, manual: 0 });
        assert_eq!(report.verdict, Verdict::Manual);
    }

    #[test]
    fn duplicates_and_missing_values_per_side() {
        let auto = table(
            &["case_id", "cas_titre_localisation"],
            &[&["C1", "a"], &["C1", "a"], &["C2", ""]],
        );
        let manual = table(&["case_id"], &[&["C1"], &["C2"]]);
        let report = compare_tables(&auto, &manual, files());
        assert_eq!(report.duplicate_rows, Pair { automated: 1, manual: 0 });
        assert_eq!(
            report.duplicate_case_ids,
            Pair {
                automated: Some(1),
                manual: Some(0)
            }
        );
        assert_eq!(report.missing_critical[1].counts.automated, Some(1));
        assert_eq!(report.missing_critical[1].counts.manual, None);
        // Different row counts: no cell-level diff.
        assert!(report.column_differences.is_empty());
        // Manual wins on duplicates, automated on row count.
        assert_eq!(report.score, Pair { automated: 1, manual: 1 });
        assert_eq!(report.verdict, Verdict::Tie);
    }
}
