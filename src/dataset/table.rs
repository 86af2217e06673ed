//! Column-labelled table of nullable strings with a declared, ordered schema.
//!
//! Every stage of the pipeline hands one of these to the next. A missing value
//! is `None`; empty strings never survive a load.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use csv::StringRecord;

use crate::error::{ensure_exists, GeipanError, Result};

/// Field separator used by every file the pipeline reads or writes.
pub const DELIMITER: u8 = b'|';

pub type Cell = Option<String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, index: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).and_then(|cell| cell.as_deref()))
    }

    pub fn column_by_name(&self, name: &str) -> Option<impl Iterator<Item = Option<&str>> + '_> {
        self.column_index(name).map(|index| self.column(index))
    }

    pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
        let index = self.column_index(name)?;
        self.rows.get(row)?.get(index)?.as_deref()
    }

    pub fn non_null_count(&self, index: usize) -> usize {
        self.column(index).filter(Option::is_some).count()
    }

    /// Rows that repeat an earlier row exactly, across every column.
    pub fn duplicate_row_count(&self) -> usize {
        let mut seen = HashSet::with_capacity(self.rows.len());
        self.rows.iter().filter(|row| !seen.insert(*row)).count()
    }

    /// Drop exact full-row repeats, keeping the first occurrence. Returns how
    /// many rows were removed.
    pub fn remove_duplicate_rows(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen: HashSet<Vec<Cell>> = HashSet::with_capacity(before);
        self.rows.retain(|row| seen.insert(row.clone()));
        before - self.rows.len()
    }

    /// Keep only the columns whose flag is set, in their current order.
    pub fn retain_columns(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.columns.len());
        let mut flags = keep.iter();
        self.columns.retain(|_| *flags.next().unwrap_or(&true));
        for row in &mut self.rows {
            let mut flags = keep.iter();
            row.retain(|_| *flags.next().unwrap_or(&true));
        }
    }

    /// Values repeated within a column: `len - distinct`, with all nulls
    /// counted as one value.
    pub fn duplicate_values(&self, index: usize) -> usize {
        let mut seen = HashSet::new();
        self.column(index).filter(|value| !seen.insert(*value)).count()
    }
}

/// Trimmed value, or `None` if nothing is left.
pub fn non_empty(value: &str) -> Cell {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Make header labels unique and non-blank: a blank label at position `i`
/// becomes `Unnamed: i`, and repeats of a label get `.1`, `.2`, ... suffixes.
pub fn normalize_headers<'a>(labels: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut headers = Vec::new();
    for (index, label) in labels.into_iter().enumerate() {
        let label = label.trim();
        let base = if label.is_empty() {
            format!("Unnamed: {index}")
        } else {
            label.to_string()
        };
        let mut name = base.clone();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{base}.{suffix}");
            suffix += 1;
        }
        seen.insert(name.clone());
        headers.push(name);
    }
    headers
}

/// Whole file as UTF-8 text. A missing file is `FileNotFound`, invalid UTF-8 a
/// parse error.
pub(crate) fn read_source(path: &Path) -> Result<String> {
    ensure_exists(path)?;
    fs::read_to_string(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::InvalidData {
            GeipanError::parse(path, 0, "file is not valid UTF-8")
        } else {
            GeipanError::io(path, err)
        }
    })
}

pub(crate) fn pipe_reader(data: &str, has_headers: bool) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(data.as_bytes())
}

pub(crate) fn record_line(record: &StringRecord) -> u64 {
    record.position().map(|pos| pos.line()).unwrap_or(0)
}

/// Header plus raw string rows. Short rows are padded with empty fields; a row
/// wider than the header is a parse error.
pub(crate) fn read_headed_records(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let source = read_source(path)?;
    let mut reader = pipe_reader(&source, true);
    let header = reader
        .headers()
        .map_err(|err| GeipanError::csv(path, err))?
        .clone();
    let columns = normalize_headers(header.iter());
    if columns.is_empty() {
        return Err(GeipanError::parse(path, 1, "header row has no columns"));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| GeipanError::csv(path, err))?;
        if record.len() > columns.len() {
            return Err(GeipanError::parse(
                path,
                record_line(&record),
                format!(
                    "expected at most {} fields, found {}",
                    columns.len(),
                    record.len()
                ),
            ));
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(columns.len(), String::new());
        rows.push(row);
    }
    Ok((columns, rows))
}

/// Read a headed pipe-delimited file (such as a persisted output) back into a
/// [`Table`]. Empty fields become `None`; other values are kept verbatim.
pub fn read_table(path: &Path) -> Result<Table> {
    let (columns, raw_rows) = read_headed_records(path)?;
    let rows = raw_rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|value| if value.is_empty() { None } else { Some(value) })
                .collect()
        })
        .collect();
    Ok(Table { columns, rows })
}

/// Number of data rows in a headed pipe-delimited file, tolerating ragged rows.
pub fn count_data_rows(path: &Path) -> Result<usize> {
    let source = read_source(path)?;
    let mut reader = pipe_reader(&source, true);
    let mut count = 0;
    for record in reader.records() {
        record.map_err(|err| GeipanError::csv(path, err))?;
        count += 1;
    }
    Ok(count)
}
