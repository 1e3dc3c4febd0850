//! Disk Cache: one CSV file per [`CacheKey`] under a root directory.
//!
//! Entries are created on the first successful fetch for a key and only read
//! afterwards. Writes go to a uniquely named `.tmp` file that is renamed into
//! place, so a reader never sees a half-written entry.

use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;
use uuid::Uuid;

use crate::cache::csv_format::{from_csv_bytes, to_csv_bytes};
use crate::cache::{CacheError, CacheKey};
use crate::merge::IntegrityError;
use crate::models::dataset::Dataset;

/// Whether [`DiskCache::fetch_or_load`] found the entry or had to fetch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

pub struct DiskCache {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    claims: Mutex<HashMap<String, String>>,
}

impl DiskCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
            claims: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    /// Reads the entry for `key`, or `None` when nothing is stored yet.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<Dataset>, CacheError> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(from_csv_bytes(&bytes, &path)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::io(path, e)),
        }
    }

    /// Stores `dataset` under `key`. Fails with [`CacheError::AlreadyExists`]
    /// rather than overwriting.
    pub async fn put(&self, key: &CacheKey, dataset: &Dataset) -> Result<PathBuf, CacheError> {
        self.claim(key)?;
        let lock = self.lock_for(key);
        let _guard = lock.lock().await;
        self.write_entry(key, dataset).await
    }

    /// Returns the stored entry for `key`, or runs `fetch`, stores its result
    /// and returns it.
    ///
    /// The check, the fetch and the write form one critical section per key:
    /// concurrent callers for the same key issue at most one fetch, callers
    /// for different keys never wait on each other.
    pub async fn fetch_or_load<F, Fut, E>(
        &self,
        key: &CacheKey,
        fetch: F,
    ) -> Result<(Dataset, CacheStatus), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Dataset, E>>,
        E: From<CacheError>,
    {
        self.claim(key).map_err(CacheError::from)?;
        let lock = self.lock_for(key);
        let _guard = lock.lock().await;

        if let Some(dataset) = self.get(key).await? {
            debug!(key = %key, "cache hit");
            return Ok((dataset, CacheStatus::Hit));
        }
        debug!(key = %key, "cache miss");
        let dataset = fetch().await?;
        self.write_entry(key, &dataset).await?;
        Ok((dataset, CacheStatus::Miss))
    }

    async fn write_entry(&self, key: &CacheKey, dataset: &Dataset) -> Result<PathBuf, CacheError> {
        let path = self.path_for(key);
        if tokio::fs::try_exists(&path)
            .await
            .map_err(|e| CacheError::io(&path, e))?
        {
            return Err(CacheError::AlreadyExists(key.to_string()));
        }
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| CacheError::io(&self.root, e))?;

        let bytes = to_csv_bytes(dataset).map_err(|source| CacheError::Csv {
            path: path.clone(),
            source,
        })?;
        let tmp = self.root.join(format!(".{}.{}.tmp", key.file_name(), Uuid::new_v4()));
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| CacheError::io(&tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CacheError::io(&path, e));
        }
        Ok(path)
    }

    /// Records which request `key` belongs to and rejects a second,
    /// different request landing on the same file. Keys differing only in
    /// letter case count as the same file, as they do on case-insensitive
    /// file systems.
    fn claim(&self, key: &CacheKey) -> Result<(), IntegrityError> {
        let mut claims = self.claims.lock().unwrap_or_else(PoisonError::into_inner);
        match claims.get(&key.folded()) {
            Some(origin) if origin != key.origin() => Err(IntegrityError::KeyCollision {
                key: key.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                claims.insert(key.folded(), key.origin().to_string());
                Ok(())
            }
        }
    }

    fn lock_for(&self, key: &CacheKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(key.to_string()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tempfile::TempDir;

    use super::*;
    use crate::models::scalar::Scalar;

    fn sample() -> Dataset {
        let mut ds = Dataset::with_columns(["Ticker", "Close"]).unwrap();
        ds.push_row(vec![Scalar::from("AAA"), Scalar::from(10.0)]).unwrap();
        ds
    }

    #[tokio::test]
    async fn get_on_empty_cache_is_none() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path());
        let key = CacheKey::resolve("qq", "beta/live/insiders", None);
        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_then_get_and_never_overwrite() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path().join("nested"));
        let key = CacheKey::resolve("av", "query", Some("AAA"));
        let path = cache.put(&key, &sample()).await.unwrap();
        assert!(path.ends_with("av_query_AAA.csv"));
        assert_eq!(cache.get(&key).await.unwrap(), Some(sample()));

        let err = cache.put(&key, &Dataset::default()).await.unwrap_err();
        assert!(matches!(err, CacheError::AlreadyExists(_)));
        assert_eq!(cache.get(&key).await.unwrap(), Some(sample()));
    }

    #[tokio::test]
    async fn no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path());
        cache
            .put(&CacheKey::resolve("av", "query", Some("AAA")), &sample())
            .await
            .unwrap();
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, ["av_query_AAA.csv"]);
    }

    #[tokio::test]
    async fn second_load_is_a_hit_without_fetching() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path());
        let key = CacheKey::resolve("av", "query", Some("AAA"));
        let calls = AtomicUsize::new(0);
        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, CacheError>(sample())
        };

        let (first, status) = cache.fetch_or_load(&key, fetch).await.unwrap();
        assert_eq!(status, CacheStatus::Miss);
        let (second, status) = cache.fetch_or_load(&key, fetch).await.unwrap();
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_loads_of_one_key_fetch_once() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path());
        let key = CacheKey::resolve("av", "query", Some("AAA"));
        let calls = AtomicUsize::new(0);
        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok::<_, CacheError>(sample())
        };

        let (a, b) = tokio::join!(
            cache.fetch_or_load(&key, fetch),
            cache.fetch_or_load(&key, fetch)
        );
        assert_eq!(a.unwrap().0, b.unwrap().0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetch_stores_nothing() {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path());
        let key = CacheKey::resolve("av", "query", Some("AAA"));
        let result = cache
            .fetch_or_load(&key, || async {
                Err::<Dataset, _>(CacheError::AlreadyExists("boom".into()))
            })
            .await;
        assert!(result.is_err());
        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[test]
    fn keys_differing_only_in_case_collide() {
        let cache = DiskCache::new("unused");
        let upper = CacheKey::resolve("av", "query", Some("AAA"));
        let lower = CacheKey::resolve("av", "query", Some("aaa"));
        assert_ne!(upper.as_str(), lower.as_str());
        cache.claim(&upper).unwrap();
        cache.claim(&upper).unwrap();
        assert!(matches!(
            cache.claim(&lower),
            Err(IntegrityError::KeyCollision { .. })
        ));
    }

    #[tokio::test]
    async fn a_later_instance_never_sees_another_requests_entry() {
        let dir = TempDir::new().unwrap();
        let stored = CacheKey::scoped("av", "query", Some("OVERVIEW_X"), None);
        DiskCache::new(dir.path()).put(&stored, &sample()).await.unwrap();

        let fresh = DiskCache::new(dir.path());
        let other = CacheKey::scoped("av", "query", Some("OVERVIEW"), Some("X"));
        let mut own = Dataset::with_columns(["Ticker", "Close"]).unwrap();
        own.push_row(vec![Scalar::from("BBB"), Scalar::from(20.0)]).unwrap();
        let (dataset, status) = fresh
            .fetch_or_load(&other, || async { Ok::<_, CacheError>(own.clone()) })
            .await
            .unwrap();
        assert_eq!(status, CacheStatus::Miss);
        assert_eq!(dataset, own);
        assert_eq!(fresh.get(&stored).await.unwrap(), Some(sample()));
    }
}
