//! Output registry: where each produced dataset lives and when it was written.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dataset::persist::PersistReport;
use crate::error::{GeipanError, Result};

pub const OUTPUT_DATASET_NAME: &str = "geipan_case_ovni_cleaned";
pub const SOURCE_NAME: &str = "geipan_public_export";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSetEntry {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    pub path: String,
    #[serde(default)]
    pub rows: usize,
    #[serde(default)]
    pub columns: usize,
}

pub type Registry = BTreeMap<String, DataSetEntry>;

pub fn load_registry(path: &Path) -> Result<Registry> {
    if !path.exists() {
        return Ok(Registry::new());
    }
    let raw = fs::read_to_string(path).map_err(|err| GeipanError::io(path, err))?;
    serde_json::from_str(&raw)
        .map_err(|err| GeipanError::parse(path, err.line() as u64, err.to_string()))
}

/// Insert or replace the entry for `name` in `registry` (as read by
/// [`load_registry`]) and write it to `registry_path`.
pub fn record_output(
    registry_path: &Path,
    mut registry: Registry,
    name: &str,
    output: &PersistReport,
) -> Result<Registry> {
    registry.insert(
        name.to_string(),
        DataSetEntry {
            source: SOURCE_NAME.to_string(),
            last_updated: Some(chrono::Utc::now().format("%Y-%m-%d").to_string()),
            path: output.path.clone(),
            rows: output.rows,
            columns: output.columns,
        },
    );

    if let Some(parent) = registry_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| GeipanError::io(parent, err))?;
    }
    fs::write(registry_path, serde_json::to_string_pretty(&registry)?)
        .map_err(|err| GeipanError::io(registry_path, err))?;
    tracing::debug!(path = %registry_path.display(), name, "registry updated");
    Ok(registry)
}
