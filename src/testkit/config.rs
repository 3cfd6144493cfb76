//! Canonical test configurations.
//!
//! Single source of truth for config values used across tests.

use crate::infrastructure::config::ReconnectionConfig;

/// Short backoff (10 ms doubling to 100 ms), retrying forever.
pub fn reconnection() -> ReconnectionConfig {
    ReconnectionConfig {
        initial_delay_ms: 10,
        max_delay_ms: 100,
        backoff_multiplier: 2.0,
        max_attempts: None,
    }
}

/// [`reconnection`] giving up after `max_attempts` failed attempts.
pub fn reconnection_limited(max_attempts: u32) -> ReconnectionConfig {
    ReconnectionConfig {
        max_attempts: Some(max_attempts),
        ..reconnection()
    }
}

/// A complete configuration file touching every section.
pub const SAMPLE_TOML: &str = r#"
[api]
base_url = "https://api.example.test"
tenant_id = "7c9e6679-7425-40de-944b-e07fc1f90ae7"
timeout_ms = 2000
retry_max_attempts = 2

[hub]
url = "https://api.example.test/hubs/tracking"
invoke_timeout_ms = 5000

[hub.reconnection]
initial_delay_ms = 250
max_delay_ms = 4000
max_attempts = 8

[cache]
stale_time_ms = 5000
cache_time_ms = 60000

[refresh]
interval_secs = 10

[logging]
level = "debug"
format = "json"
"#;
