//! Query cache and list refresh settings.

use std::time::Duration;

use serde::Deserialize;

use crate::application::cache::{CacheOptions, DEFAULT_CACHE_TIME, DEFAULT_STALE_TIME};
use crate::application::list::DEFAULT_REFRESH_INTERVAL;

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Age at which a cached page is refetched on the next load.
    #[serde(default = "default_stale_time_ms")]
    pub stale_time_ms: u64,
    /// Age at which a cached page is discarded.
    #[serde(default = "default_cache_time_ms")]
    pub cache_time_ms: u64,
}

const fn default_stale_time_ms() -> u64 {
    DEFAULT_STALE_TIME.as_millis() as u64
}

const fn default_cache_time_ms() -> u64 {
    DEFAULT_CACHE_TIME.as_millis() as u64
}

impl CacheConfig {
    #[must_use]
    pub const fn options(&self) -> CacheOptions {
        CacheOptions::from_millis(self.stale_time_ms, self.cache_time_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time_ms: default_stale_time_ms(),
            cache_time_ms: default_cache_time_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    /// Period of `--watch` list refreshes.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

const fn default_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL.as_secs()
}

impl RefreshConfig {
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}
