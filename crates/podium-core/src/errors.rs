use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading or writing a backing sheet.
///
/// These are caught at the service boundary: read paths degrade to the
/// cached (or empty) view, write paths report partial success. Nothing
/// here should ever take the process down.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read sheet {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write sheet {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sheet {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("sheet {path} is missing required column {column:?}")]
    MissingColumn { path: PathBuf, column: String },
}

#[derive(Debug, Error)]
#[error("ConfigError: {0}")]
pub struct ConfigError(pub String);
