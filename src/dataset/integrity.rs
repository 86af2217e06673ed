//! Non-fatal data problems. They are logged as they are found and carried in
//! the stage reports; none of them stops a run.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityWarning {
    /// Case rows dropped because their `case_id` was already seen.
    DuplicateCaseIds { removed: usize },
    /// Case rows dropped because their `case_id` was blank.
    BlankCaseIds { removed: usize },
    /// Testimony rows identical to an earlier one across every column.
    DuplicateTestimonies { removed: usize },
    SparseColumnsDropped { dropped: usize, remaining: usize },
    /// `case_id` values still repeated in the case set handed to the join.
    ResidualDuplicateCaseIds { count: usize },
    /// Rows the join produced beyond one per testimony.
    JoinFanOut { extra_rows: usize },
    DuplicateJoinedRows { removed: usize },
    /// Testimonies whose `case_id` has no case; their `cas_*` fields are empty.
    UnmatchedTestimonies { count: usize },
}

impl IntegrityWarning {
    pub fn log(&self) {
        tracing::warn!(warning = ?self, "{self}");
    }
}

impl fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateCaseIds { removed } => {
                write!(f, "{removed} duplicate case_id value(s) removed from the case table")
            }
            Self::BlankCaseIds { removed } => {
                write!(f, "{removed} case row(s) without a case_id removed")
            }
            Self::DuplicateTestimonies { removed } => {
                write!(f, "{removed} fully duplicated testimony row(s) removed")
            }
            Self::SparseColumnsDropped { dropped, remaining } => write!(
                f,
                "{dropped} sparse testimony column(s) dropped, {remaining} remaining"
            ),
            Self::ResidualDuplicateCaseIds { count } => {
                write!(f, "{count} case_id value(s) still duplicated in the case table")
            }
            Self::JoinFanOut { extra_rows } => write!(
                f,
                "join produced {extra_rows} extra row(s) from duplicated case_id values"
            ),
            Self::DuplicateJoinedRows { removed } => {
                write!(f, "{removed} exact duplicate row(s) removed after the join")
            }
            Self::UnmatchedTestimonies { count } => {
                write!(f, "{count} testimony row(s) reference no known case")
            }
        }
    }
}

/// Log `warning` and keep it for the report.
pub(crate) fn raise(warnings: &mut Vec<IntegrityWarning>, warning: IntegrityWarning) {
    warning.log();
    warnings.push(warning);
}
