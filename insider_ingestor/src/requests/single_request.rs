use crate::cache::{CacheKey, CacheStatus, DiskCache};
use crate::models::dataset::Dataset;
use crate::models::endpoint::EndpointDescriptor;
use crate::providers::shape::into_dataset;
use crate::providers::{DatasetSource, FetchError};

/// Fetches `descriptor` through the cache.
///
/// `value` is the varying parameter the cache key is derived from (`None`
/// for endpoints that take no per-call value). The source is only called on
/// a cache miss, and only a successfully shaped dataset is stored.
pub async fn fetch_cached(
    source: &dyn DatasetSource,
    cache: &DiskCache,
    descriptor: &EndpointDescriptor,
    value: Option<&str>,
) -> Result<(Dataset, CacheStatus), FetchError> {
    let key = CacheKey::for_descriptor(descriptor, value);
    cache
        .fetch_or_load(&key, || async {
            let payload = source.fetch(descriptor).await?;
            into_dataset(payload, descriptor)
        })
        .await
}
