//! Request caching layer.
//!
//! This module provides a resource-agnostic memoization layer that:
//! - Keys cached payloads by endpoint path + canonical (sorted) query string
//! - Expires entries lazily after a TTL (5 minutes by default)
//! - Supports single-key, prefix and full invalidation after mutations
//! - Runs an optional periodic sweep that clears everything

mod key;
mod layer;
mod storage;
mod traits;

pub use key::RequestKey;
pub use layer::CacheLayer;
pub use storage::{CacheStats, RequestCache, DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL};
pub use traits::{CacheResult, CacheSource};
