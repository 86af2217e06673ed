//! Writes a [`Table`] as pipe-delimited UTF-8 text.
//!
//! The file is written beside its destination and renamed into place, so a
//! failed run never leaves a truncated output behind.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::dataset::table::{Table, DELIMITER};
use crate::error::{GeipanError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistReport {
    pub path: String,
    pub bytes: u64,
    pub rows: usize,
    pub columns: usize,
}

pub fn write_table(table: &Table, path: &Path) -> Result<PersistReport> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| GeipanError::io(parent, err))?;
    }

    let staging = staging_path(path);
    if let Err(err) = write_rows(table, &staging) {
        let _ = fs::remove_file(&staging);
        return Err(err);
    }
    if let Err(err) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(GeipanError::io(path, err));
    }

    let bytes = fs::metadata(path)
        .map_err(|err| GeipanError::io(path, err))?
        .len();
    tracing::info!(
        path = %path.display(),
        bytes,
        rows = table.len(),
        columns = table.width(),
        "output written"
    );

    Ok(PersistReport {
        path: path.display().to_string(),
        bytes,
        rows: table.len(),
        columns: table.width(),
    })
}

fn write_rows(table: &Table, staging: &Path) -> Result<()> {
    let file = File::create(staging).map_err(|err| GeipanError::io(staging, err))?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_writer(BufWriter::new(file));

    writer
        .write_record(&table.columns)
        .map_err(|err| GeipanError::csv(staging, err))?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))
            .map_err(|err| GeipanError::csv(staging, err))?;
    }

    let mut buffered = writer
        .into_inner()
        .map_err(|err| GeipanError::io(staging, err.into_error()))?;
    buffered
        .flush()
        .map_err(|err| GeipanError::io(staging, err))?;
    let file = buffered
        .into_inner()
        .map_err(|err| GeipanError::io(staging, err.into_error()))?;
    file.sync_all().map_err(|err| GeipanError::io(staging, err))
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{name}.partial"))
}
