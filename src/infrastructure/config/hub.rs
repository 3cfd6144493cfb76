//! Tracking hub connection and reconnection settings.

use serde::Deserialize;

/// Hub reconnection backoff.
///
/// The delay before attempt `n` is `initial_delay_ms * backoff_multiplier^(n-1)`
/// plus up to 20% jitter, never more than `max_delay_ms`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectionConfig {
    /// Delay before the first reconnection attempt (milliseconds).
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound of any delay (milliseconds).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Multiplier applied to the delay after each failed attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Consecutive failed attempts before giving up. Unset retries forever.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

const fn default_initial_delay_ms() -> u64 {
    1_000
}

const fn default_max_delay_ms() -> u64 {
    10_000
}

const fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_attempts: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Hub endpoint; `http(s)` is mapped to `ws(s)`.
    #[serde(default = "default_hub_url")]
    pub url: String,
    /// How long an invocation waits for its completion (milliseconds).
    #[serde(default = "default_invoke_timeout_ms")]
    pub invoke_timeout_ms: u64,
    /// Idle time after which a keep-alive ping is sent (milliseconds).
    #[serde(default = "default_keep_alive_interval_ms")]
    pub keep_alive_interval_ms: u64,
    #[serde(default)]
    pub reconnection: ReconnectionConfig,
}

fn default_hub_url() -> String {
    "http://localhost:5257/hubs/tracking".to_string()
}

const fn default_invoke_timeout_ms() -> u64 {
    15_000
}

const fn default_keep_alive_interval_ms() -> u64 {
    15_000
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            url: default_hub_url(),
            invoke_timeout_ms: default_invoke_timeout_ms(),
            keep_alive_interval_ms: default_keep_alive_interval_ms(),
            reconnection: ReconnectionConfig::default(),
        }
    }
}
