//! Pipeline configuration: file locations and the sparse-column threshold.
//!
//! Layering, lowest to highest precedence: built-in defaults, an optional YAML
//! file, the `GEIPAN_DATA_DIR` environment variable, then explicit CLI flags
//! (applied by the caller through [`PathOverrides`]).

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{GeipanError, Result};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_CASES_FILE: &str = "export_cas_pub_20251127093552.csv";
pub const DEFAULT_TESTIMONIES_FILE: &str = "export_temoignages_pub_20251127093610.csv";
pub const DEFAULT_OUTPUT_FILE: &str = "geipan_case_ovni_cleaned.csv";
pub const DEFAULT_MANUAL_FILE: &str = "geipan_case_ovni_cleaned_corrected.csv";
pub const DEFAULT_REGISTRY_FILE: &str = "registry.json";
/// Testimony columns must be filled in strictly more than this share of rows.
pub const DEFAULT_SPARSE_THRESHOLD: f64 = 0.05;
pub const DATA_DIR_ENV: &str = "GEIPAN_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub cases_file: PathBuf,
    pub testimonies_file: PathBuf,
    pub output_file: PathBuf,
    pub manual_file: PathBuf,
    pub registry_file: PathBuf,
    pub sparse_threshold: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            cases_file: PathBuf::from(DEFAULT_CASES_FILE),
            testimonies_file: PathBuf::from(DEFAULT_TESTIMONIES_FILE),
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            manual_file: PathBuf::from(DEFAULT_MANUAL_FILE),
            registry_file: PathBuf::from(DEFAULT_REGISTRY_FILE),
            sparse_threshold: DEFAULT_SPARSE_THRESHOLD,
        }
    }
}

/// Explicit paths from the command line. Each one wins over the config.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub data_dir: Option<PathBuf>,
    pub cases: Option<PathBuf>,
    pub testimonies: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

impl PipelineConfig {
    /// Defaults, then `config_path` if given, then the environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| GeipanError::io(path, err))?;
        Self::from_yaml_str(&raw).map_err(|message| GeipanError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, String> {
        let config: Self = if raw.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(raw).map_err(|err| err.to_string())?
        };
        config.check()?;
        Ok(config)
    }

    pub fn with_overrides(mut self, overrides: PathOverrides) -> Self {
        if let Some(dir) = overrides.data_dir {
            self.data_dir = dir;
        }
        if let Some(path) = overrides.cases {
            self.cases_file = path;
        }
        if let Some(path) = overrides.testimonies {
            self.testimonies_file = path;
        }
        if let Some(path) = overrides.output {
            self.output_file = path;
        }
        self
    }

    fn check(&self) -> Result<(), String> {
        if !(0.0..1.0).contains(&self.sparse_threshold) {
            return Err(format!(
                "sparse_threshold must be within [0, 1), got {}",
                self.sparse_threshold
            ));
        }
        Ok(())
    }

    /// Relative file names resolve under `data_dir`; absolute ones are kept.
    fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.data_dir.join(file)
        }
    }

    pub fn cases_path(&self) -> PathBuf {
        self.resolve(&self.cases_file)
    }

    pub fn testimonies_path(&self) -> PathBuf {
        self.resolve(&self.testimonies_file)
    }

    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output_file)
    }

    pub fn manual_path(&self) -> PathBuf {
        self.resolve(&self.manual_file)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.resolve(&self.registry_file)
    }
}
