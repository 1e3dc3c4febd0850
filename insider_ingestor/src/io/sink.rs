use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::cache::csv_format::to_csv_bytes;
use crate::models::dataset::Dataset;

#[derive(Debug, Error)]
pub enum SinkError {
    /// Writing the output file failed.
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("polars operation failed: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}

#[async_trait]
pub trait DataSink: Send + Sync {
    /// What a successful write hands back, e.g. the path of the created file.
    type Output;

    /// Writes `dataset` under the logical name `name`.
    async fn write(&self, name: &str, dataset: &Dataset) -> Result<Self::Output, SinkError>;
}

/// Writes `{dir}/{name}.csv` in the cache's delimited layout.
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl DataSink for CsvSink {
    type Output = PathBuf;

    async fn write(&self, name: &str, dataset: &Dataset) -> Result<PathBuf, SinkError> {
        let bytes = to_csv_bytes(dataset)?;
        write_atomic(&self.dir, &format!("{name}.csv"), &bytes).await
    }
}

/// Writes `bytes` to `{dir}/{file_name}` through a temp file and a rename.
/// Unlike cache entries, outputs are replaced on every run.
pub(crate) async fn write_atomic(
    dir: &Path,
    file_name: &str,
    bytes: &[u8],
) -> Result<PathBuf, SinkError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| SinkError::Io { path, source }
    };
    tokio::fs::create_dir_all(dir).await.map_err(io_err(dir))?;
    let path = dir.join(file_name);
    let tmp = dir.join(format!(".{file_name}.{}.tmp", Uuid::new_v4()));
    tokio::fs::write(&tmp, bytes).await.map_err(io_err(&tmp))?;
    if let Err(source) = tokio::fs::rename(&tmp, &path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(SinkError::Io { path, source });
    }
    Ok(path)
}
