//! File-backed cache of fetched datasets, one CSV file per request identity.

pub mod csv_format;
pub mod disk;
pub mod key;

use std::path::PathBuf;

use thiserror::Error;

use crate::merge::IntegrityError;
use crate::models::dataset::SchemaError;

pub use disk::{CacheStatus, DiskCache};
pub use key::CacheKey;

#[derive(Debug, Error)]
pub enum CacheError {
    /// `put` never overwrites an existing entry.
    #[error("cache entry `{0}` already exists")]
    AlreadyExists(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed cache file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("cached dataset does not fit its columns: {0}")]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}
