//! Shared query cache.
//!
//! - [`key`]: deterministic keys built from a scope and a serializable payload
//! - [`query::QueryCache`]: entries with stale/expiry instants, de-duplicated
//!   loads and prefix invalidation

pub mod key;
pub mod query;

pub use key::{build_key, stable_json, CacheKey};
pub use query::{CacheEntry, CacheOptions, QueryCache, DEFAULT_CACHE_TIME, DEFAULT_STALE_TIME};
