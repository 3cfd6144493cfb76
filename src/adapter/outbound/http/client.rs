//! JSON client for the backend REST API.
//!
//! Every request carries the tenant header and bearer token when configured.
//! Reads are retried on connect errors and timeouts; writes only on connect
//! errors, where the request never reached the server.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client as HttpClient, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::TenantId;
use crate::error::{Error, Result};
use crate::infrastructure::config::api::ApiConfig;

/// Header selecting the tenant on multi-tenant deployments.
pub const TENANT_HEADER: &str = "X-Tenant-Id";

/// HTTP client for the backend API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
    base_url: String,
    retry_max_attempts: u32,
    retry_backoff_ms: u64,
}

impl ApiClient {
    /// Client with default timeouts and no retries.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.into(),
            retry_max_attempts: 1,
            retry_backoff_ms: 0,
        }
    }

    /// Client using the `[api]` settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the token or tenant cannot be sent as a header, or
    /// the HTTP client cannot be built.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let headers = default_headers(config.tenant_id, config.token.as_deref())?;
        let http = HttpClient::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            retry_max_attempts: config.retry_max_attempts,
            retry_backoff_ms: config.retry_backoff_ms,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// `GET path?query`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] for non-success statuses, [`Error::Http`] for
    /// transport failures and [`Error::Json`] for unexpected bodies.
    pub async fn get<T>(&self, path: &str, query: &[(&'static str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.url(path);
        self.execute(true, || self.http.get(&url).query(query)).await
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let body = serde_json::to_value(body)?;
        self.execute(false, || self.http.request(Method::POST, &url).json(&body))
            .await
    }

    async fn execute<T, F>(&self, idempotent: bool, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let max_attempts = self.retry_max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match build().send().await {
                Ok(response) => return decode(response).await,
                Err(err) => {
                    if attempt >= max_attempts || !should_retry(&err, idempotent) {
                        return Err(err.into());
                    }
                    self.backoff(attempt, max_attempts, &err).await;
                }
            }
        }
    }

    async fn backoff(&self, attempt: u32, max_attempts: u32, err: &reqwest::Error) {
        warn!(
            attempt,
            max_attempts,
            error = %err,
            "HTTP request failed, retrying"
        );
        let delay = retry_delay(self.retry_backoff_ms, attempt);
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}

/// Upper bound on the wait between two attempts.
const MAX_RETRY_BACKOFF_MS: u64 = 10_000;

/// Wait after failed attempt `attempt`: the base doubled per attempt, capped.
fn retry_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 1_u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor).min(MAX_RETRY_BACKOFF_MS))
}

fn should_retry(err: &reqwest::Error, idempotent: bool) -> bool {
    err.is_connect() || (idempotent && err.is_timeout())
}

#[allow(clippy::result_large_err)]
fn default_headers(tenant_id: Option<TenantId>, token: Option<&str>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Some(tenant_id) = tenant_id {
        let value = HeaderValue::from_str(&tenant_id.to_string())
            .map_err(|e| Error::Connection(format!("invalid tenant header: {e}")))?;
        headers.insert(TENANT_HEADER, value);
    }
    if let Some(token) = token {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| Error::Connection(format!("invalid API token: {e}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}

/// Map a response to `T`, or to [`Error::Api`] for non-success statuses.
///
/// A `204 No Content` decodes as JSON `null`.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    debug!(status = status.as_u16(), url = %response.url(), "API response");

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Api {
            status: status.as_u16(),
            details: error_details(status, &body),
        });
    }
    if status == StatusCode::NO_CONTENT {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

/// Human-readable failure text from an error body.
///
/// Prefers the `message`, `error`, `detail` or `title` field of a JSON body,
/// then the raw text, then the status reason.
fn error_details(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error", "detail", "title"] {
            if let Some(Value::String(text)) = fields.get(key) {
                if !text.is_empty() {
                    return text.clone();
                }
            }
        }
    }
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_doubles_up_to_the_cap() {
        assert_eq!(retry_delay(500, 1), Duration::from_millis(500));
        assert_eq!(retry_delay(500, 2), Duration::from_millis(1_000));
        assert_eq!(retry_delay(500, 3), Duration::from_millis(2_000));
        assert_eq!(retry_delay(500, 6), Duration::from_millis(MAX_RETRY_BACKOFF_MS));
        assert_eq!(retry_delay(500, 90), Duration::from_millis(MAX_RETRY_BACKOFF_MS));
        assert!(retry_delay(0, 4).is_zero());
    }

    #[test]
    fn joins_paths_without_double_slash() {
        let client = ApiClient::new("http://localhost:5257/");
        assert_eq!(client.url("/api/orders"), "http://localhost:5257/api/orders");
        assert_eq!(client.base_url(), "http://localhost:5257/");
    }

    #[test]
    fn error_details_prefer_json_message() {
        assert_eq!(
            error_details(StatusCode::BAD_REQUEST, r#"{"message":"Order not found"}"#),
            "Order not found"
        );
        assert_eq!(
            error_details(StatusCode::BAD_REQUEST, r#"{"title":"One or more validation errors occurred."}"#),
            "One or more validation errors occurred."
        );
    }

    #[test]
    fn error_details_fall_back_to_text_then_reason() {
        assert_eq!(error_details(StatusCode::BAD_GATEWAY, "upstream down\n"), "upstream down");
        assert_eq!(error_details(StatusCode::NOT_FOUND, ""), "Not Found");
    }

    #[test]
    fn headers_carry_tenant_and_token() {
        let tenant = TenantId::parse("11111111-2222-3333-4444-555555555555").unwrap();
        let headers = default_headers(Some(tenant), Some("abc")).unwrap();

        assert_eq!(
            headers.get(TENANT_HEADER).unwrap(),
            "11111111-2222-3333-4444-555555555555"
        );
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[test]
    fn headers_without_credentials() {
        let headers = default_headers(None, None).unwrap();
        assert!(headers.get(TENANT_HEADER).is_none());
        assert!(headers.get(AUTHORIZATION).is_none());
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
    }

    #[test]
    fn rejects_unprintable_token() {
        assert!(default_headers(None, Some("bad\ntoken")).is_err());
    }

    #[test]
    fn builds_from_config() {
        let config = ApiConfig {
            token: Some("abc".into()),
            ..ApiConfig::default()
        };
        let client = ApiClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5257");
        assert_eq!(client.retry_max_attempts, 3);
    }
}
