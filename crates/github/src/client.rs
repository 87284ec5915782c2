//! HTTP plumbing shared by every GitHub port implementation.
//!
//! Reads go through [`GitHubClient::get`], which retries on rate limits,
//! timeouts, connection faults and 5xx responses. Writes go through
//! [`GitHubClient::send`] and are attempted exactly once.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use compliance::{PlatformError, RetryPolicy};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::GitHubClientConfig;

/// Media type for JSON REST responses.
pub(crate) const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Media type that returns file contents verbatim.
pub(crate) const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";

const API_VERSION: &str = "2022-11-28";

/// Errors raised while constructing a [`GitHubClient`].
#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error("API base URL must start with http:// or https://: {0}")]
    InvalidBaseUrl(String),

    #[error("GitHub token is empty")]
    EmptyToken,

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// GitHub REST client implementing the [`compliance`] platform ports.
///
/// Cheap to share behind an `Arc`; the underlying connection pool is reused
/// across every call.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    pub(crate) http: reqwest::Client,
    pub(crate) config: GitHubClientConfig,
}

impl GitHubClient {
    pub fn new(config: GitHubClientConfig) -> Result<Self, ClientBuildError> {
        let base = config.api_base_url.trim_end_matches('/');
        if !(base.starts_with("https://") || base.starts_with("http://")) {
            return Err(ClientBuildError::InvalidBaseUrl(config.api_base_url.clone()));
        }
        if config.token.trim().is_empty() {
            return Err(ClientBuildError::EmptyToken);
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_MEDIA_TYPE));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        let config = GitHubClientConfig {
            api_base_url: base.to_string(),
            ..config
        };
        Ok(Self { http, config })
    }

    /// Joins `path` (which must start with `/`) onto the API base URL.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    /// Issues a GET, retrying transient failures with exponential back-off.
    pub(crate) async fn get(&self, url: &str, accept: &'static str) -> Result<Response, PlatformError> {
        let mut attempt = 0;
        loop {
            let result = self.execute(self.request(Method::GET, url).header(ACCEPT, accept), url).await;
            let err = match result {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };
            match err.retry_policy() {
                RetryPolicy::Retryable { after } if attempt < self.config.max_retries => {
                    let delay = self.config.backoff(attempt, after);
                    attempt += 1;
                    warn!(
                        url,
                        attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "GitHub request failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                _ => return Err(err),
            }
        }
    }

    /// Issues a write with a JSON body. Never retried: a timed-out POST may
    /// still have taken effect.
    pub(crate) async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: &B,
    ) -> Result<Response, PlatformError> {
        self.execute(self.request(method, url).json(body), url).await
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.http.request(method, url).bearer_auth(&self.config.token)
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<Response, PlatformError> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        debug!(url, status = status.as_u16(), "GitHub response");

        if status.is_success() {
            return Ok(response);
        }
        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        Err(map_status(status, &headers, &body, url))
    }
}

/// Converts a non-success response into a [`PlatformError`].
pub(crate) fn map_status(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    url: &str,
) -> PlatformError {
    match status {
        StatusCode::NOT_FOUND => PlatformError::NotFound {
            resource: url.to_string(),
        },
        StatusCode::UNAUTHORIZED => PlatformError::Authentication {
            message: error_message(body, status),
        },
        StatusCode::TOO_MANY_REQUESTS => PlatformError::RateLimited {
            retry_after: retry_after(headers, SystemTime::now()),
        },
        // GitHub reports both primary and secondary rate limits as 403.
        StatusCode::FORBIDDEN if is_rate_limited(headers, body) => PlatformError::RateLimited {
            retry_after: retry_after(headers, SystemTime::now()),
        },
        _ => PlatformError::Api {
            status: status.as_u16(),
            message: error_message(body, status),
        },
    }
}

pub(crate) fn map_transport_error(err: reqwest::Error) -> PlatformError {
    if err.is_timeout() {
        PlatformError::Timeout
    } else if err.is_decode() {
        PlatformError::UnexpectedResponse {
            message: err.to_string(),
        }
    } else {
        PlatformError::Network {
            message: err.to_string(),
        }
    }
}

fn is_rate_limited(headers: &HeaderMap, body: &str) -> bool {
    header_str(headers, "x-ratelimit-remaining") == Some("0")
        || headers.contains_key("retry-after")
        || body.to_ascii_lowercase().contains("rate limit")
}

/// Delay requested by the server, from `Retry-After` (seconds) or
/// `x-ratelimit-reset` (epoch seconds).
pub(crate) fn retry_after(headers: &HeaderMap, now: SystemTime) -> Option<Duration> {
    if let Some(seconds) = header_str(headers, "retry-after").and_then(|v| v.trim().parse::<u64>().ok()) {
        return Some(Duration::from_secs(seconds));
    }
    let reset = header_str(headers, "x-ratelimit-reset")?.trim().parse::<u64>().ok()?;
    let now = now.duration_since(UNIX_EPOCH).ok()?.as_secs();
    Some(Duration::from_secs(reset.saturating_sub(now)))
}

/// Whether the `Link` header advertises a `rel="next"` page.
pub(crate) fn has_next_page(headers: &HeaderMap) -> bool {
    header_str(headers, "link").is_some_and(|link| {
        link.split(',')
            .any(|part| part.split(';').skip(1).any(|param| param.trim() == r#"rel="next""#))
    })
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn error_message(body: &str, status: StatusCode) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => status.to_string(),
    }
}
