use super::resource::ResourceId;
use super::types::MediaRecord;
use super::Result;
use async_trait::async_trait;
use moka::future::Cache;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Byte-oriented key-value store backing the record cache.
///
/// Keys are flat ASCII resource ids; values are JSON-serialized records
/// with the `format` field stripped. Entries have no expiry: a successful
/// generation is stable raw data and stays until the store is purged.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;
}

/// In-process store over a moka cache, bounded only by entry capacity.
pub struct MemoryStore {
    inner: Cache<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: Cache::builder().max_capacity(capacity).build(),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.get(key).await)
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.inner.insert(key.to_string(), value).await;
        Ok(())
    }
}

/// Cache-aside wrapper around provider generation.
///
/// Without a store this degrades to calling the generator directly.
#[derive(Clone)]
pub struct CachedFetcher {
    store: Option<Arc<dyn CacheStore>>,
}

impl CachedFetcher {
    pub fn new(store: Option<Arc<dyn CacheStore>>) -> Self {
        Self { store }
    }

    /// Caching disabled; every call reaches the generator.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    /// Read-through lookup.
    ///
    /// On a hit the generator is never invoked and the cached record is
    /// returned as-is (its `format` is absent and must be re-rendered by
    /// the caller). On a miss the generated record is written back iff it
    /// succeeded; failures are returned but never cached. Store errors and
    /// malformed entries are logged and swallowed: caching must never be
    /// the cause of a failed request.
    ///
    /// Concurrent misses for the same key race; each invokes the generator
    /// and the last write wins.
    pub async fn with_cache<F, Fut>(&self, id: &ResourceId, generate: F) -> Result<MediaRecord>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<MediaRecord>>,
    {
        let key = id.key();

        if let Some(store) = &self.store {
            match store.get(&key).await {
                Ok(Some(bytes)) => match MediaRecord::from_cache_bytes(&bytes) {
                    Ok(record) => {
                        debug!("cache hit for {key}");
                        return Ok(record);
                    }
                    Err(e) => warn!("discarding malformed cache entry {key}: {e}"),
                },
                Ok(None) => {}
                Err(e) => warn!("cache read failed for {key}: {e}"),
            }
        }

        let record = generate().await?;

        if record.success
            && let Some(store) = &self.store
        {
            match record.to_cache_bytes() {
                Ok(bytes) => {
                    if let Err(e) = store.put(&key, bytes).await {
                        warn!("cache write failed for {key}: {e}");
                    }
                }
                Err(e) => warn!("failed to serialize record for {key}: {e}"),
            }
        }

        Ok(record)
    }
}
