use thiserror::Error;

use crate::cache::CacheError;
use crate::models::dataset::SchemaError;

/// Failure class of a [`FetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The HTTP exchange did not complete (connect, timeout, body read).
    Transport,
    /// The provider answered, but not with data.
    Provider,
    /// The local cache could not be read or written.
    Cache,
}

/// Per-item failures. The batch layers record these and carry on.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// A 2xx body that is the provider's own error envelope.
    #[error("provider error: {0}")]
    Envelope(String),

    /// A single object where rows were expected. Carries the object's keys.
    #[error("expected rows, got a single object with keys {0:?}")]
    UnexpectedDocument(Vec<String>),

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("response rows do not fit: {0}")]
    Schema(#[from] SchemaError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Transport(_) => FailureKind::Transport,
            FetchError::Cache(_) => FailureKind::Cache,
            FetchError::Status { .. }
            | FetchError::Envelope(_)
            | FetchError::UnexpectedDocument(_)
            | FetchError::Decode(_)
            | FetchError::Schema(_) => FailureKind::Provider,
        }
    }
}
