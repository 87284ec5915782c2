//! Connection settings for the GitHub REST adapter.

use std::time::Duration;

/// Public GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Largest page size the REST API accepts.
pub const MAX_PAGE_SIZE: u8 = 100;

/// GitHub adapter configuration.
#[derive(Clone)]
pub struct GitHubClientConfig {
    /// REST base URL; override for GitHub Enterprise Server
    /// (e.g. `"https://ghe.example.com/api/v3"`).
    pub api_base_url: String,
    /// Personal access token or installation token.
    pub token: String,
    /// Sent as `User-Agent`; GitHub rejects requests without one.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries for idempotent reads. Writes are never retried.
    pub max_retries: u32,
    /// First back-off delay; doubles on each retry.
    pub initial_backoff: Duration,
    /// Back-off ceiling, including delays requested by the server.
    pub max_backoff: Duration,
    /// Items requested per page for every listing.
    pub page_size: u8,
}

impl GitHubClientConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            token: token.into(),
            user_agent: concat!("pre-commit-audit/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            page_size: MAX_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u8) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Delay before retry number `attempt + 1`.
    ///
    /// Exponential from `initial_backoff`; a server-requested delay is used
    /// instead when it is longer. Never exceeds `max_backoff`.
    pub fn backoff(&self, attempt: u32, requested: Option<Duration>) -> Duration {
        let exponential = self
            .initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt));
        requested
            .map_or(exponential, |after| after.max(exponential))
            .min(self.max_backoff)
    }
}

impl std::fmt::Debug for GitHubClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClientConfig")
            .field("api_base_url", &self.api_base_url)
            .field("token", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("initial_backoff", &self.initial_backoff)
            .field("max_backoff", &self.max_backoff)
            .field("page_size", &self.page_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_is_capped() {
        let config = GitHubClientConfig::new("t");
        assert_eq!(config.backoff(0, None), Duration::from_millis(500));
        assert_eq!(config.backoff(1, None), Duration::from_secs(1));
        assert_eq!(config.backoff(2, None), Duration::from_secs(2));
        assert_eq!(config.backoff(20, None), Duration::from_secs(30));
    }

    #[test]
    fn longer_server_delay_wins_but_is_capped() {
        let config = GitHubClientConfig::new("t");
        assert_eq!(config.backoff(0, Some(Duration::from_secs(5))), Duration::from_secs(5));
        assert_eq!(config.backoff(0, Some(Duration::from_millis(10))), Duration::from_millis(500));
        assert_eq!(config.backoff(0, Some(Duration::from_secs(3600))), Duration::from_secs(30));
    }

    #[test]
    fn debug_output_redacts_the_token() {
        let rendered = format!("{:?}", GitHubClientConfig::new("ghp_secret"));
        assert!(!rendered.contains("ghp_secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(GitHubClientConfig::new("t").with_page_size(0).page_size, 1);
        assert_eq!(GitHubClientConfig::new("t").with_page_size(250).page_size, 100);
    }
}
