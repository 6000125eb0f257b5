//! Cache layer that orchestrates cache lookups with network fetching.

use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use super::key::RequestKey;
use super::storage::RequestCache;
use super::traits::CacheResult;

/// Cache-first fetching in front of an arbitrary async fetcher.
///
/// Only successful responses are stored; a failed fetch leaves the cache
/// untouched and returns the error.
#[derive(Debug, Clone)]
pub struct CacheLayer {
  cache: Arc<RequestCache>,
}

impl CacheLayer {
  pub fn new(cache: Arc<RequestCache>) -> Self {
    Self { cache }
  }

  pub fn cache(&self) -> &Arc<RequestCache> {
    &self.cache
  }

  /// Fetch with cache-first strategy.
  ///
  /// 1. Check cache - if valid, return immediately
  /// 2. Otherwise run the fetcher
  /// 3. Store the successful result under `key`
  pub async fn fetch<F, Fut, E>(&self, key: &RequestKey, fetcher: F) -> Result<CacheResult<Value>, E>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Value, E>>,
  {
    if let Some((value, cached_at)) = self.cache.get_entry(key) {
      return Ok(CacheResult::from_cache(value, cached_at));
    }

    let value = fetcher().await?;
    self.cache.set(key.clone(), value.clone());
    Ok(CacheResult::from_network(value))
  }

  /// Always hit the network and skip storing the result.
  pub async fn fetch_uncached<F, Fut, E>(&self, fetcher: F) -> Result<CacheResult<Value>, E>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Value, E>>,
  {
    let value = fetcher().await?;
    Ok(CacheResult::from_network(value))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::CacheSource;
  use serde_json::json;
  use std::sync::atomic::{AtomicU32, Ordering};

  #[tokio::test]
  async fn test_fetch_miss_then_hit() {
    let layer = CacheLayer::new(Arc::new(RequestCache::new()));
    let key = RequestKey::path("/teachers");
    let calls = AtomicU32::new(0);

    let first = layer
      .fetch(&key, || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, String>(json!([1]))
      })
      .await
      .unwrap();
    assert_eq!(first.source, CacheSource::Network);
    assert!(first.cached_at.is_none());

    let second = layer
      .fetch(&key, || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, String>(json!([2]))
      })
      .await
      .unwrap();
    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(second.data, json!([1]));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_failed_fetch_is_not_cached() {
    let cache = Arc::new(RequestCache::new());
    let layer = CacheLayer::new(cache.clone());
    let key = RequestKey::path("/teachers");

    let result = layer
      .fetch(&key, || async { Err::<Value, _>("offline".to_string()) })
      .await;
    assert_eq!(result.unwrap_err(), "offline");
    assert!(cache.is_empty());
  }

  #[tokio::test]
  async fn test_fetch_uncached_leaves_cache_empty() {
    let cache = Arc::new(RequestCache::new());
    let layer = CacheLayer::new(cache.clone());

    let result = layer
      .fetch_uncached(|| async { Ok::<_, String>(json!({"page": 2})) })
      .await
      .unwrap();
    assert_eq!(result.source, CacheSource::Network);
    assert!(cache.is_empty());
  }
}
