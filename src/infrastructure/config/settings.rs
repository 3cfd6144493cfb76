//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all client settings.
//! Configuration is loaded from a TOML file with environment variable overrides
//! for the API token and the endpoints.
//!
//! # Example
//!
//! ```no_run
//! use trackly::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("trackly.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use url::Url;

use super::api::ApiConfig;
use super::cache::{CacheConfig, RefreshConfig};
use super::hub::HubConfig;
use super::logging::LoggingConfig;
use crate::domain::TenantId;
use crate::error::{ConfigError, Result};

/// Bearer token for the REST API.
pub const ENV_API_TOKEN: &str = "TRACKLY_API_TOKEN";
/// Overrides `api.base_url`.
pub const ENV_API_URL: &str = "TRACKLY_API_URL";
/// Overrides `hub.url`.
pub const ENV_HUB_URL: &str = "TRACKLY_HUB_URL";
/// Overrides `api.tenant_id`.
pub const ENV_TENANT_ID: &str = "TRACKLY_TENANT_ID";

/// Main application configuration.
///
/// Load from a TOML file using [`Config::load`] or parse directly with
/// [`Config::parse_toml`]. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    /// Tracking hub endpoint and reconnection policy.
    #[serde(default)]
    pub hub: HubConfig,

    /// Freshness windows of the query cache.
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub refresh: RefreshConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse configuration from TOML content and apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed, an override is not
    /// a valid value, or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        Self::parse_with_env(content, |key| std::env::var(key).ok())
    }

    /// Like [`parse_toml`](Self::parse_toml), reading overrides from `env`.
    ///
    /// # Errors
    ///
    /// See [`parse_toml`](Self::parse_toml).
    #[allow(clippy::result_large_err)]
    pub fn parse_with_env<F>(content: &str, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.apply_overrides(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is
    /// malformed, or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Load `path` when it exists, otherwise start from defaults.
    ///
    /// Environment overrides and validation apply either way.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    #[allow(clippy::result_large_err)]
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Self::parse_toml("")
        }
    }

    #[allow(clippy::result_large_err)]
    fn apply_overrides<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        // The token is never read from the file.
        self.api.token = env(ENV_API_TOKEN).filter(|token| !token.trim().is_empty());

        if let Some(url) = env(ENV_API_URL) {
            self.api.base_url = url;
        }
        if let Some(url) = env(ENV_HUB_URL) {
            self.hub.url = url;
        }
        if let Some(tenant) = env(ENV_TENANT_ID) {
            let tenant = TenantId::parse(&tenant).map_err(|e| ConfigError::InvalidValue {
                field: "tenant_id",
                reason: e.to_string(),
            })?;
            self.api.tenant_id = Some(tenant);
        }
        Ok(())
    }

    /// Validate configuration values.
    ///
    /// Checks that endpoints parse as URLs with a supported scheme and that
    /// timing values are within acceptable ranges.
    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        validate_url("base_url", &self.api.base_url, &["http", "https"])?;
        validate_url("hub.url", &self.hub.url, &["http", "https", "ws", "wss"])?;

        if self.api.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.api.retry_max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry_max_attempts",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.hub.invoke_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "invoke_timeout_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.hub.keep_alive_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "keep_alive_interval_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        let reconnection = &self.hub.reconnection;
        if reconnection.initial_delay_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "initial_delay_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if reconnection.max_delay_ms < reconnection.initial_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "max_delay_ms",
                reason: "must be >= initial_delay_ms".to_string(),
            }
            .into());
        }
        if reconnection.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "backoff_multiplier",
                reason: "must be >= 1.0".to_string(),
            }
            .into());
        }
        if reconnection.max_attempts == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_attempts",
                reason: "must be greater than 0 when set".to_string(),
            }
            .into());
        }

        if self.cache.cache_time_ms < self.cache.stale_time_ms {
            return Err(ConfigError::InvalidValue {
                field: "cache_time_ms",
                reason: "must be >= stale_time_ms".to_string(),
            }
            .into());
        }
        if self.refresh.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "interval_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

#[allow(clippy::result_large_err)]
fn validate_url(field: &'static str, value: &str, schemes: &[&str]) -> Result<()> {
    let url = Url::parse(value).map_err(|e| ConfigError::InvalidValue {
        field,
        reason: e.to_string(),
    })?;
    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!("unsupported scheme '{}'", url.scheme()),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn parse(content: &str) -> Result<Config> {
        Config::parse_with_env(content, no_env)
    }

    fn invalid_field(result: Result<Config>) -> &'static str {
        match result {
            Err(Error::Config(ConfigError::InvalidValue { field, .. })) => field,
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.api.base_url, "http://localhost:5257");
        assert_eq!(config.hub.url, "http://localhost:5257/hubs/tracking");
        assert_eq!(config.cache.stale_time_ms, 30_000);
        assert_eq!(config.cache.cache_time_ms, 600_000);
        assert_eq!(config.refresh.interval_secs, 30);
        assert_eq!(config.hub.reconnection.initial_delay_ms, 1_000);
        assert_eq!(config.hub.reconnection.max_delay_ms, 10_000);
        assert!(config.hub.reconnection.max_attempts.is_none());
        assert!(config.api.token.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn sections_are_read() {
        let config = parse(
            r#"
            [api]
            base_url = "https://api.trackly.test"
            tenant_id = "11111111-2222-3333-4444-555555555555"
            retry_max_attempts = 1

            [hub]
            url = "wss://api.trackly.test/hubs/tracking"

            [hub.reconnection]
            initial_delay_ms = 500
            max_attempts = 5

            [cache]
            stale_time_ms = 1000
            cache_time_ms = 5000

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://api.trackly.test");
        assert!(config.api.tenant_id.is_some());
        assert_eq!(config.api.retry_max_attempts, 1);
        assert_eq!(config.hub.reconnection.initial_delay_ms, 500);
        assert_eq!(config.hub.reconnection.max_delay_ms, 10_000);
        assert_eq!(config.hub.reconnection.max_attempts, Some(5));
        assert_eq!(config.cache.options().stale_time.as_millis(), 1000);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn environment_overrides_file() {
        let config = Config::parse_with_env(
            r#"
            [api]
            base_url = "http://file.test"
            "#,
            |key| match key {
                ENV_API_TOKEN => Some("secret".into()),
                ENV_API_URL => Some("https://env.test".into()),
                ENV_HUB_URL => Some("https://env.test/hubs/tracking".into()),
                ENV_TENANT_ID => Some("11111111-2222-3333-4444-555555555555".into()),
                _ => None,
            },
        )
        .unwrap();

        assert_eq!(config.api.token.as_deref(), Some("secret"));
        assert_eq!(config.api.base_url, "https://env.test");
        assert_eq!(config.hub.url, "https://env.test/hubs/tracking");
        assert_eq!(
            config.api.tenant_id.map(|t| t.to_string()).as_deref(),
            Some("11111111-2222-3333-4444-555555555555")
        );
    }

    #[test]
    fn token_in_file_is_ignored() {
        let config = parse(
            r#"
            [api]
            token = "from-file"
            "#,
        )
        .unwrap();
        assert!(config.api.token.is_none());
    }

    #[test]
    fn invalid_tenant_override_is_rejected() {
        let result = Config::parse_with_env("", |key| {
            (key == ENV_TENANT_ID).then(|| "tenant-one".to_string())
        });
        assert_eq!(invalid_field(result), "tenant_id");
    }

    #[test]
    fn rejects_bad_urls() {
        assert_eq!(
            invalid_field(parse("[api]\nbase_url = \"not a url\"")),
            "base_url"
        );
        assert_eq!(
            invalid_field(parse("[hub]\nurl = \"ftp://host/hubs/tracking\"")),
            "hub.url"
        );
    }

    #[test]
    fn rejects_inverted_cache_windows() {
        let result = parse("[cache]\nstale_time_ms = 10000\ncache_time_ms = 5000");
        assert_eq!(invalid_field(result), "cache_time_ms");
    }

    #[test]
    fn rejects_bad_reconnection_values() {
        assert_eq!(
            invalid_field(parse("[hub.reconnection]\ninitial_delay_ms = 0")),
            "initial_delay_ms"
        );
        assert_eq!(
            invalid_field(parse(
                "[hub.reconnection]\ninitial_delay_ms = 5000\nmax_delay_ms = 1000"
            )),
            "max_delay_ms"
        );
        assert_eq!(
            invalid_field(parse("[hub.reconnection]\nbackoff_multiplier = 0.5")),
            "backoff_multiplier"
        );
        assert_eq!(
            invalid_field(parse("[hub.reconnection]\nmax_attempts = 0")),
            "max_attempts"
        );
    }

    #[test]
    fn rejects_zero_refresh_interval() {
        assert_eq!(
            invalid_field(parse("[refresh]\ninterval_secs = 0")),
            "interval_secs"
        );
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let result = parse("[api\nbase_url = ");
        assert!(matches!(result, Err(Error::Config(ConfigError::Parse(_)))));
    }
}
