//! Bounded Batch Fetcher.
//!
//! Values are specialized into descriptors and fetched through the cache by
//! a pool of at most `pool_size` in-flight futures. Futures are started in
//! submission order and collected in completion order. A failing value is
//! recorded and never affects the others.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::cache::{CacheError, CacheStatus, DiskCache};
use crate::merge::IntegrityError;
use crate::models::dataset::Dataset;
use crate::models::endpoint::RequestTemplate;
use crate::providers::{DatasetSource, FetchError};
use crate::requests::single_request::fetch_cached;

/// Results of one batch. Order is completion order, not input order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub succeeded: Vec<(String, Dataset)>,
    pub failed: Vec<(String, FetchError)>,
    pub cache_hits: usize,
}

#[derive(Clone)]
pub struct BatchFetcher {
    source: Arc<dyn DatasetSource>,
    cache: Arc<DiskCache>,
}

impl BatchFetcher {
    pub fn new(source: Arc<dyn DatasetSource>, cache: Arc<DiskCache>) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    pub fn source(&self) -> &dyn DatasetSource {
        self.source.as_ref()
    }

    /// Fetches every value of `values` through `template`.
    ///
    /// Transport, provider and cache I/O failures end up in
    /// [`BatchOutcome::failed`]. Only a cache-key collision, which would
    /// mix up two requests' data, fails the whole call.
    pub async fn fetch_all(
        &self,
        values: &[String],
        template: &RequestTemplate,
        pool_size: usize,
    ) -> Result<BatchOutcome, IntegrityError> {
        let mut outcome = BatchOutcome::default();
        if values.is_empty() {
            return Ok(outcome);
        }

        let results: Vec<_> = stream::iter(values.iter().map(|value| async move {
            let descriptor = template.specialize(value);
            let result = fetch_cached(
                self.source.as_ref(),
                &self.cache,
                &descriptor,
                Some(value.as_str()),
            )
            .await;
            (value.clone(), result)
        }))
        .buffer_unordered(pool_size.max(1))
        .collect()
        .await;

        for (value, result) in results {
            match result {
                Ok((dataset, status)) => {
                    if status == CacheStatus::Hit {
                        outcome.cache_hits += 1;
                    }
                    debug!(value = %value, rows = dataset.len(), ?status, "fetched");
                    outcome.succeeded.push((value, dataset));
                }
                Err(FetchError::Cache(CacheError::Integrity(e))) => return Err(e),
                Err(e) => {
                    warn!(value = %value, kind = ?e.kind(), error = %e, "skipping value");
                    outcome.failed.push((value, e));
                }
            }
        }
        Ok(outcome)
    }
}
