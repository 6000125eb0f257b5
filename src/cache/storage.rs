//! In-memory request cache with TTL expiry.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::key::RequestKey;

/// Default validity window of a cached response.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default period of the background sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// A single cached payload.
#[derive(Debug, Clone)]
struct CacheEntry {
  value: Value,
  /// Monotonic timestamp used for expiry
  stored_at: Instant,
  /// Wall clock timestamp reported to callers
  cached_at: DateTime<Utc>,
}

/// Hit/miss/eviction counters.
#[derive(Debug, Default)]
pub struct CacheStats {
  hits: AtomicU64,
  misses: AtomicU64,
  evictions: AtomicU64,
}

impl CacheStats {
  pub fn hits(&self) -> u64 {
    self.hits.load(Ordering::Relaxed)
  }

  pub fn misses(&self) -> u64 {
    self.misses.load(Ordering::Relaxed)
  }

  pub fn evictions(&self) -> u64 {
    self.evictions.load(Ordering::Relaxed)
  }
}

/// Time-boxed memoization of successful reads, keyed by [`RequestKey`].
///
/// Shared between every store of a session behind an `Arc`. Operations never
/// fail; a poisoned lock is recovered since entries are plain values.
#[derive(Debug)]
pub struct RequestCache {
  entries: Mutex<HashMap<RequestKey, CacheEntry>>,
  ttl: Duration,
  stats: CacheStats,
}

impl Default for RequestCache {
  fn default() -> Self {
    Self::new()
  }
}

impl RequestCache {
  pub fn new() -> Self {
    Self::with_ttl(DEFAULT_TTL)
  }

  pub fn with_ttl(ttl: Duration) -> Self {
    Self {
      entries: Mutex::new(HashMap::new()),
      ttl,
      stats: CacheStats::default(),
    }
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  pub fn stats(&self) -> &CacheStats {
    &self.stats
  }

  fn entries(&self) -> MutexGuard<'_, HashMap<RequestKey, CacheEntry>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Get a cached value if present and not expired.
  pub fn get(&self, key: &RequestKey) -> Option<Value> {
    self.get_entry(key).map(|(value, _)| value)
  }

  /// Like [`get`](Self::get), also returning when the value was stored.
  ///
  /// Expired entries are removed as they are encountered.
  pub fn get_entry(&self, key: &RequestKey) -> Option<(Value, DateTime<Utc>)> {
    let mut entries = self.entries();

    let expired = match entries.get(key) {
      Some(entry) if entry.stored_at.elapsed() < self.ttl => {
        self.stats.hits.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%key, "cache hit");
        return Some((entry.value.clone(), entry.cached_at));
      }
      Some(_) => true,
      None => false,
    };

    if expired {
      entries.remove(key);
      self.stats.evictions.fetch_add(1, Ordering::Relaxed);
      tracing::debug!(%key, "cache entry expired");
    }
    self.stats.misses.fetch_add(1, Ordering::Relaxed);
    None
  }

  /// Store a value, replacing any previous entry for the key.
  pub fn set(&self, key: RequestKey, value: Value) {
    tracing::debug!(%key, "cache set");
    self.entries().insert(
      key,
      CacheEntry {
        value,
        stored_at: Instant::now(),
        cached_at: Utc::now(),
      },
    );
  }

  /// Remove a single entry.
  pub fn invalidate(&self, key: &RequestKey) {
    if self.entries().remove(key).is_some() {
      tracing::debug!(%key, "cache invalidated");
    }
  }

  /// Remove every entry whose path is `prefix` or nested under it.
  pub fn invalidate_prefix(&self, prefix: &str) {
    let mut entries = self.entries();
    let before = entries.len();
    entries.retain(|key, _| !key.is_under(prefix));
    tracing::debug!(prefix, removed = before - entries.len(), "cache prefix invalidated");
  }

  /// Remove all entries.
  pub fn clear(&self) {
    let mut entries = self.entries();
    let removed = entries.len();
    entries.clear();
    tracing::debug!(removed, "cache cleared");
  }

  pub fn len(&self) -> usize {
    self.entries().len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries().is_empty()
  }

  pub fn contains(&self, key: &RequestKey) -> bool {
    self.entries().contains_key(key)
  }

  /// Spawn a task that clears the whole cache every `interval`.
  ///
  /// The task holds a weak reference and exits once the cache is dropped.
  pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
    let cache = Arc::downgrade(self);
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
      loop {
        ticker.tick().await;
        match cache.upgrade() {
          Some(cache) => {
            tracing::trace!("periodic cache sweep");
            cache.clear();
          }
          None => break,
        }
      }
    })
  }
}
