//! Sanity battery for a persisted dataset.
//!
//! Each named check passes or fails on its own and leaves severity-tagged
//! diagnostics behind. A missing or unreadable file stops the battery with an
//! error instead.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::dataset::stats::{
    dataset_stats, parse_observation_date, DatasetStats, CASE_ID_COLUMN, CLASSIFICATION_COLUMN,
    DATE_COLUMN, DEPARTMENT_COLUMN, REGION_COLUMN, TITLE_COLUMN,
};
use crate::dataset::table::{count_data_rows, read_table, Table};
use crate::error::{ensure_exists, GeipanError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationSeverity {
    Error,
    Warning,
    Info,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationDiagnostic {
    pub severity: ValidationSeverity,
    pub context: String,
    pub message: String,
}

impl fmt::Display for ValidationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.context, self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    pub fn push(
        &mut self,
        severity: ValidationSeverity,
        context: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(ValidationDiagnostic {
            severity,
            context: context.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.severity == ValidationSeverity::Error)
    }

    fn errors_in(&self, context: &str) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.severity == ValidationSeverity::Error && diag.context == context)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationSummary {
    pub path: String,
    pub bytes: u64,
    pub rows: usize,
    pub columns: usize,
    pub checks: Vec<CheckOutcome>,
    pub passed: usize,
    pub total: usize,
    pub diagnostics: Vec<ValidationDiagnostic>,
    pub stats: DatasetStats,
}

impl ValidationSummary {
    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationDiagnostic> {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity == ValidationSeverity::Error)
    }
}

pub const REQUIRED_COLUMNS: [&str; 6] = [
    CASE_ID_COLUMN,
    TITLE_COLUMN,
    CLASSIFICATION_COLUMN,
    DATE_COLUMN,
    REGION_COLUMN,
    DEPARTMENT_COLUMN,
];

/// Narrative columns that must be free of HTML line breaks.
pub const LONG_TEXT_COLUMNS: [&str; 3] = [
    "cas_description_detaillee",
    "cas_resume_court",
    "cas_notes_additionnelles",
];

pub const CLASSIFICATIONS: [&str; 7] = ["A", "B", "C", "D", "D1", "D2", "NC"];

const LINE_BREAK_NEEDLE: &str = "<br";

/// Run the battery against the file at `path`. When `original_testimonies`
/// is given, the row count is compared with that file's.
pub fn validate_dataset(
    path: &Path,
    original_testimonies: Option<&Path>,
) -> Result<ValidationSummary> {
    ensure_exists(path)?;
    let bytes = std::fs::metadata(path)
        .map_err(|err| GeipanError::io(path, err))?
        .len();
    let table = read_table(path)?;
    let original_count = original_testimonies.map(count_data_rows).transpose()?;

    let mut report = ValidationReport::default();
    let checks = vec![
        CheckOutcome {
            name: "structure",
            passed: check_structure(&mut report, &table),
        },
        CheckOutcome {
            name: "join",
            passed: check_join(&mut report, &table, original_count),
        },
        CheckOutcome {
            name: "html_cleanup",
            passed: check_html(&mut report, &table),
        },
        CheckOutcome {
            name: "empty_columns",
            passed: check_empty_columns(&mut report, &table),
        },
        CheckOutcome {
            name: "classifications",
            passed: check_classifications(&mut report, &table),
        },
        CheckOutcome {
            name: "dates",
            passed: check_dates(&mut report, &table),
        },
    ];

    let passed = checks.iter().filter(|check| check.passed).count();
    let summary = ValidationSummary {
        path: path.display().to_string(),
        bytes,
        rows: table.len(),
        columns: table.width(),
        total: checks.len(),
        passed,
        checks,
        diagnostics: report.diagnostics,
        stats: dataset_stats(&table),
    };
    tracing::info!(
        path = %path.display(),
        passed = summary.passed,
        total = summary.total,
        "validation finished"
    );
    Ok(summary)
}

fn check_structure(report: &mut ValidationReport, table: &Table) -> bool {
    for column in REQUIRED_COLUMNS {
        if !table.has_column(column) {
            report.push(
                ValidationSeverity::Error,
                "structure",
                format!("missing required column '{column}'"),
            );
        }
    }
    !report.errors_in("structure")
}

fn check_join(report: &mut ValidationReport, table: &Table, original: Option<usize>) -> bool {
    if let Some(original) = original {
        let rows = table.len();
        if rows < original {
            report.push(
                ValidationSeverity::Warning,
                "join",
                format!(
                    "{} testimonies missing ({rows} rows, {original} originally)",
                    original - rows
                ),
            );
        } else if rows > original {
            report.push(
                ValidationSeverity::Warning,
                "join",
                format!(
                    "{} more rows than original testimonies, likely case_id fan-out",
                    rows - original
                ),
            );
        }
    }

    let Some(title) = table.column_by_name(TITLE_COLUMN) else {
        report.push(
            ValidationSeverity::Error,
            "join",
            format!("cannot check join without '{TITLE_COLUMN}'"),
        );
        return false;
    };
    let without_case = title
        .filter(|value| value.map_or(true, |value| value.trim().is_empty()))
        .count();
    if without_case > 0 {
        report.push(
            ValidationSeverity::Error,
            "join",
            format!("{without_case} row(s) carry no case information"),
        );
    }

    if let Some(index) = table.column_index(CASE_ID_COLUMN) {
        let repeated = table.duplicate_values(index);
        report.push(
            ValidationSeverity::Info,
            "join",
            format!(
                "{} rows over {} distinct case_id value(s)",
                table.len(),
                table.len() - repeated
            ),
        );
    }
    !report.errors_in("join")
}

fn check_html(report: &mut ValidationReport, table: &Table) -> bool {
    for column in LONG_TEXT_COLUMNS {
        let Some(values) = table.column_by_name(column) else {
            continue;
        };
        let tagged = values
            .flatten()
            .filter(|value| value.to_ascii_lowercase().contains(LINE_BREAK_NEEDLE))
            .count();
        if tagged > 0 {
            report.push(
                ValidationSeverity::Error,
                "html_cleanup",
                format!("{tagged} value(s) in '{column}' still contain '<br'"),
            );
        }
    }
    !report.errors_in("html_cleanup")
}

fn check_empty_columns(report: &mut ValidationReport, table: &Table) -> bool {
    for (index, column) in table.columns.iter().enumerate() {
        let empty = table
            .column(index)
            .all(|value| value.map_or(true, |value| value.trim().is_empty()));
        if empty {
            report.push(
                ValidationSeverity::Error,
                "empty_columns",
                format!("column '{column}' is entirely empty"),
            );
        }
    }
    !report.errors_in("empty_columns")
}

fn check_classifications(report: &mut ValidationReport, table: &Table) -> bool {
    let Some(values) = table.column_by_name(CLASSIFICATION_COLUMN) else {
        report.push(
            ValidationSeverity::Error,
            "classifications",
            format!("missing column '{CLASSIFICATION_COLUMN}'"),
        );
        return false;
    };

    let mut non_standard: Vec<&str> = values
        .flatten()
        .filter(|value| !value.trim().is_empty() && !CLASSIFICATIONS.contains(value))
        .collect();
    non_standard.sort_unstable();
    non_standard.dedup();
    if !non_standard.is_empty() {
        report.push(
            ValidationSeverity::Warning,
            "classifications",
            format!("non-standard classification(s): {}", non_standard.join(", ")),
        );
    }
    true
}

fn check_dates(report: &mut ValidationReport, table: &Table) -> bool {
    let Some(values) = table.column_by_name(DATE_COLUMN) else {
        report.push(
            ValidationSeverity::Error,
            "dates",
            format!("missing column '{DATE_COLUMN}'"),
        );
        return false;
    };

    let unparsable = values
        .flatten()
        .filter(|value| parse_observation_date(value).is_none())
        .count();
    if unparsable > 0 {
        report.push(
            ValidationSeverity::Warning,
            "dates",
            format!("{unparsable} observation date(s) are not dd/mm/yyyy"),
        );
    }
    true
}
