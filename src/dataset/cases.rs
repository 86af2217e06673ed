//! Case export loader.
//!
//! The export has no header row, a throwaway first line, and fifteen
//! positional columns. The sixth column is always empty and is not kept.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use crate::dataset::clean::clean_str;
use crate::dataset::integrity::{raise, IntegrityWarning};
use crate::dataset::table::{non_empty, pipe_reader, read_source, record_line};
use crate::error::{GeipanError, Result};

/// Positional layout of the raw export.
pub const RAW_CASE_COLUMNS: [&str; 15] = [
    "case_id",
    "titre_localisation",
    "date_observation",
    "departement",
    "region",
    "colonne_vide",
    "zone_geographique",
    "resume_court",
    "reference_document",
    "description_detaillee",
    "notes_additionnelles",
    "info_additionnelle",
    "classification",
    "date_publication",
    "source",
];

const EMPTY_COLUMN: usize = 5;

/// Columns of a loaded [`CaseRecord`], `case_id` first.
pub const CASE_COLUMNS: [&str; 14] = [
    "case_id",
    "titre_localisation",
    "date_observation",
    "departement",
    "region",
    "zone_geographique",
    "resume_court",
    "reference_document",
    "description_detaillee",
    "notes_additionnelles",
    "info_additionnelle",
    "classification",
    "date_publication",
    "source",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct CaseRecord {
    pub case_id: String,
    pub titre_localisation: Option<String>,
    pub date_observation: Option<String>,
    pub departement: Option<String>,
    pub region: Option<String>,
    pub zone_geographique: Option<String>,
    pub resume_court: Option<String>,
    pub reference_document: Option<String>,
    pub description_detaillee: Option<String>,
    pub notes_additionnelles: Option<String>,
    pub info_additionnelle: Option<String>,
    pub classification: Option<String>,
    pub date_publication: Option<String>,
    pub source: Option<String>,
}

impl CaseRecord {
    pub fn new(case_id: impl Into<String>) -> Self {
        Self {
            case_id: case_id.into(),
            ..Self::default()
        }
    }

    /// Every field except `case_id`, in [`CASE_COLUMNS`] order.
    pub fn attributes(&self) -> [Option<&str>; 13] {
        [
            self.titre_localisation.as_deref(),
            self.date_observation.as_deref(),
            self.departement.as_deref(),
            self.region.as_deref(),
            self.zone_geographique.as_deref(),
            self.resume_court.as_deref(),
            self.reference_document.as_deref(),
            self.description_detaillee.as_deref(),
            self.notes_additionnelles.as_deref(),
            self.info_additionnelle.as_deref(),
            self.classification.as_deref(),
            self.date_publication.as_deref(),
            self.source.as_deref(),
        ]
    }

    /// Build from the fifteen raw fields. The narrative columns go through the
    /// text cleaner; everything is trimmed and blanks become `None`.
    fn from_raw(case_id: String, raw: &[&str; 15]) -> Self {
        let text = |index: usize| non_empty(&clean_str(raw[index]));
        let plain = |index: usize| non_empty(raw[index]);
        debug_assert_eq!(RAW_CASE_COLUMNS[EMPTY_COLUMN], "colonne_vide");
        Self {
            case_id,
            titre_localisation: plain(1),
            date_observation: plain(2),
            departement: plain(3),
            region: plain(4),
            zone_geographique: plain(6),
            resume_court: text(7),
            reference_document: plain(8),
            description_detaillee: text(9),
            notes_additionnelles: text(10),
            info_additionnelle: plain(11),
            classification: plain(12),
            date_publication: plain(13),
            source: plain(14),
        }
    }
}

/// Case records in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseTable {
    pub records: Vec<CaseRecord>,
}

impl CaseTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `case_id` values that occur more than once, counted like repeated rows:
    /// `len - distinct`.
    pub fn duplicate_ids(&self) -> usize {
        let mut seen = HashSet::with_capacity(self.records.len());
        self.records
            .iter()
            .filter(|record| !seen.insert(record.case_id.as_str()))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseLoadReport {
    pub source_path: String,
    pub rows_read: usize,
    pub blank_ids_removed: usize,
    pub duplicate_ids_removed: usize,
    pub cases_loaded: usize,
    pub warnings: Vec<IntegrityWarning>,
}

pub fn load_cases(path: &Path) -> Result<(CaseTable, CaseLoadReport)> {
    let source = read_source(path)?;
    // The first physical line is an export artefact.
    let body = match source.find('\n') {
        Some(end) => &source[end + 1..],
        None => "",
    };
    let mut reader = pipe_reader(body, false);

    let mut rows_read = 0usize;
    let mut blank_ids_removed = 0usize;
    let mut duplicate_ids_removed = 0usize;
    let mut seen_ids = HashSet::new();
    let mut records = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|err| GeipanError::csv(path, err))?;
        rows_read += 1;
        let raw: [&str; 15] = match record.iter().collect::<Vec<_>>().try_into() {
            Ok(fields) => fields,
            Err(fields) => {
                return Err(GeipanError::parse(
                    path,
                    // the skipped first line is not seen by the reader
                    record_line(&record) + 1,
                    format!(
                        "expected {} fields, found {}",
                        RAW_CASE_COLUMNS.len(),
                        fields.len()
                    ),
                ))
            }
        };

        let case_id = raw[0].trim();
        if case_id.is_empty() {
            blank_ids_removed += 1;
            continue;
        }
        if !seen_ids.insert(case_id.to_string()) {
            duplicate_ids_removed += 1;
            continue;
        }
        records.push(CaseRecord::from_raw(case_id.to_string(), &raw));
    }

    let mut warnings = Vec::new();
    if blank_ids_removed > 0 {
        raise(
            &mut warnings,
            IntegrityWarning::BlankCaseIds {
                removed: blank_ids_removed,
            },
        );
    }
    if duplicate_ids_removed > 0 {
        raise(
            &mut warnings,
            IntegrityWarning::DuplicateCaseIds {
                removed: duplicate_ids_removed,
            },
        );
    }

    tracing::info!(
        path = %path.display(),
        rows_read,
        cases = records.len(),
        "case table loaded"
    );

    let report = CaseLoadReport {
        source_path: path.display().to_string(),
        rows_read,
        blank_ids_removed,
        duplicate_ids_removed,
        cases_loaded: records.len(),
        warnings,
    };
    Ok((CaseTable { records }, report))
}
