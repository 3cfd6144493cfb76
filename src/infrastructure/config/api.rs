//! Backend REST API settings.

use serde::Deserialize;

use crate::domain::TenantId;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Backend origin, e.g. `http://localhost:5257`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sent as `X-Tenant-Id` and as the hub's `tenantId` query parameter.
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    /// Bearer token. Only read from `TRACKLY_API_TOKEN`.
    #[serde(skip)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Attempts per request; timeouts and connect errors are retried.
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,
    /// Wait after the first failed attempt; doubled after each further one,
    /// up to 10 s.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:5257".to_string()
}

const fn default_timeout_ms() -> u64 {
    10_000
}

const fn default_connect_timeout_ms() -> u64 {
    5_000
}

const fn default_retry_max_attempts() -> u32 {
    3
}

const fn default_retry_backoff_ms() -> u64 {
    500
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            tenant_id: None,
            token: None,
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}
