//! Fatal errors. Anything that stops a run ends up here; non-fatal data
//! problems are [`crate::dataset::integrity::IntegrityWarning`]s instead.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeipanError {
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("parse error in {} (line {line}): {message}", path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed delimited data in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T, E = GeipanError> = std::result::Result<T, E>;

impl GeipanError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub(crate) fn csv(path: &Path, source: csv::Error) -> Self {
        if let csv::ErrorKind::Io(io) = source.kind() {
            if io.kind() == std::io::ErrorKind::NotFound {
                return Self::FileNotFound {
                    path: path.to_path_buf(),
                };
            }
        }
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn parse(path: &Path, line: u64, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            line,
            message: message.into(),
        }
    }
}

/// Fail fast with `FileNotFound` before opening a reader on `path`.
pub(crate) fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(GeipanError::FileNotFound {
            path: path.to_path_buf(),
        })
    }
}
