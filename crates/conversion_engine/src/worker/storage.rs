//! Named response caches shared by every worker version.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Storage keyed by cache name, then by request path.
pub trait CacheStorage: Send + Sync {
    fn keys(&self) -> Vec<String>;

    /// Creates the cache if needed and stores all entries in one step.
    fn put_all(&self, cache_name: &str, entries: Vec<(String, CachedResponse)>);

    fn match_path(&self, cache_name: &str, path: &str) -> Option<CachedResponse>;

    /// Returns whether a cache with that name existed.
    fn delete(&self, cache_name: &str) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStorage {
    caches: Arc<RwLock<BTreeMap<String, HashMap<String, CachedResponse>>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry_count(&self, cache_name: &str) -> usize {
        self.caches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(cache_name)
            .map_or(0, HashMap::len)
    }
}

impl CacheStorage for MemoryCacheStorage {
    fn keys(&self) -> Vec<String> {
        self.caches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn put_all(&self, cache_name: &str, entries: Vec<(String, CachedResponse)>) {
        let mut caches = self.caches.write().unwrap_or_else(PoisonError::into_inner);
        let cache = caches.entry(cache_name.to_string()).or_default();
        cache.extend(entries);
    }

    fn match_path(&self, cache_name: &str, path: &str) -> Option<CachedResponse> {
        self.caches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(cache_name)
            .and_then(|cache| cache.get(path))
            .cloned()
    }

    fn delete(&self, cache_name: &str) -> bool {
        self.caches
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(cache_name)
            .is_some()
    }
}
