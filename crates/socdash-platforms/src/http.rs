//! Shared HTTP plumbing for the platform clients: client construction, base
//! URL handling, and a GET-JSON helper that runs through the retry loop.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Url};
use socdash_core::{AppConfig, Platform};

use crate::error::PlatformError;
use crate::retry::retry_with_backoff;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const MAX_ERROR_MESSAGE_CHARS: usize = 200;

/// Timeout, user agent and retry policy shared by every client.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "socdash/0.1 (social-analytics)".to_owned(),
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

impl HttpSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.http_timeout_secs,
            user_agent: config.http_user_agent.clone(),
            max_retries: config.http_max_retries,
            retry_backoff_ms: config.http_retry_backoff_ms,
        }
    }

    /// Settings for tests: no back-off between retries.
    #[must_use]
    pub fn without_backoff() -> Self {
        Self {
            retry_backoff_ms: 0,
            ..Self::default()
        }
    }

    pub(crate) fn build_client(&self) -> Result<Client, PlatformError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(self.user_agent.clone())
            .build()?;
        Ok(client)
    }
}

/// Parses `base_url` and ensures it ends with exactly one slash, so that
/// [`Url::join`] appends relative paths instead of replacing the last segment.
pub(crate) fn parse_base_url(base_url: &str) -> Result<Url, PlatformError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| PlatformError::InvalidUrl {
        url: base_url.to_owned(),
        reason: e.to_string(),
    })
}

pub(crate) fn join(base: &Url, path: &str) -> Result<Url, PlatformError> {
    base.join(path).map_err(|e| PlatformError::InvalidUrl {
        url: format!("{base}{path}"),
        reason: e.to_string(),
    })
}

/// Sends the request built by `build` (rebuilt on every attempt), asserts a
/// 2xx status, and parses the body as JSON. Transient failures are retried.
///
/// # Errors
///
/// - [`PlatformError::Http`] on network failure.
/// - [`PlatformError::Status`] on a non-2xx status, carrying the upstream's
///   error message when the body has one.
/// - [`PlatformError::Deserialize`] if the body is not valid JSON.
pub(crate) async fn get_json<F>(
    settings: &HttpSettings,
    platform: Platform,
    context: &str,
    build: F,
) -> Result<serde_json::Value, PlatformError>
where
    F: Fn() -> RequestBuilder,
{
    let build = &build;
    retry_with_backoff(settings.max_retries, settings.retry_backoff_ms, || async move {
        let response = build().send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(PlatformError::Status {
                platform,
                status,
                message: upstream_message(&body),
            });
        }
        serde_json::from_str(&body).map_err(|e| PlatformError::Deserialize {
            context: context.to_owned(),
            source: e,
        })
    })
    .await
}

/// Decodes an already-fetched JSON value into `T`.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    body: serde_json::Value,
    context: &str,
) -> Result<T, PlatformError> {
    serde_json::from_value(body).map_err(|e| PlatformError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}

/// Best-effort extraction of a human-readable error from an upstream body.
///
/// Understands the Graph/Google `{"error":{"message"}}` shape, Twitter's
/// `{"detail"}`/`{"title"}`, and a bare `{"message"}`; otherwise returns the
/// (truncated) body itself.
pub(crate) fn upstream_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let from_json = parsed.as_ref().and_then(|v| {
        v.pointer("/error/message")
            .or_else(|| v.get("error").filter(|e| e.is_string()))
            .or_else(|| v.get("detail"))
            .or_else(|| v.get("message"))
            .or_else(|| v.get("msg"))
            .or_else(|| v.get("title"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned)
    });
    from_json.unwrap_or_else(|| body.chars().take(MAX_ERROR_MESSAGE_CHARS).collect())
}
