use shared_utils::config::ConfigError;
use thiserror::Error;

use crate::cache::CacheError;
use crate::io::SinkError;
use crate::merge::IntegrityError;
use crate::providers::FetchError;

/// The unified error type for the `insider_ingestor` crate.
///
/// Per-item fetch failures inside a batch never reach this type; they are
/// reported as skipped values instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad or missing configuration, detected before any network call.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A cache or merge invariant was violated.
    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    /// A single, unbatched request failed (e.g. the insider dataset).
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
}
