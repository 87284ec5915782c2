//! Error and retry-policy types for the pre-commit compliance domain.
//!
//! [`AuditError`] covers conditions that stop an audit before (or instead of)
//! scanning. [`PlatformError`] covers faults reported by the hosting platform;
//! these are per-call and never abort a whole scan on their own.
//!
//! [`RetryPolicy`] is a cross-cutting concern: any error type that participates
//! in retry decisions must be able to produce a [`RetryPolicy`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::TemplateName;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// Returned by infrastructure error types to let callers decide whether to
/// re-issue an idempotent request.
///
/// - `Retryable` errors: timeouts, connection faults, rate-limit responses,
///   server-side (5xx) failures.
/// - `NonRetryable` errors: authentication failures, not-found, other 4xx
///   responses, undecodable payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    ///
    /// `after` optionally specifies the minimum delay before retrying (e.g.
    /// derived from `Retry-After` or `x-ratelimit-reset` response headers).
    Retryable {
        /// Minimum back-off before the next attempt. `None` means apply the
        /// caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Hosting platform errors
// ---------------------------------------------------------------------------

/// Faults reported by (or while talking to) the hosting platform.
///
/// `NotFound` is kept distinct from every other variant: on the content-fetch
/// path it is an expected outcome, converted into
/// [`crate::ConfigArtifact::NotFound`] before validation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlatformError {
    /// The requested resource does not exist.
    #[error("not found: {resource}")]
    NotFound {
        /// Description of the missing resource (path or URL).
        resource: String,
    },

    /// The platform's rate limit is exhausted.
    #[error("rate limited; retry after {retry_after:?}")]
    RateLimited {
        /// Delay requested by the platform, if it sent one.
        retry_after: Option<Duration>,
    },

    /// The credential was rejected.
    #[error("authentication failed: {message}")]
    Authentication {
        /// Message returned by the platform.
        message: String,
    },

    /// The platform returned a non-success status not covered above.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message returned by the platform.
        message: String,
    },

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection-level failure.
    #[error("network error: {message}")]
    Network {
        /// Transport error description.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected response: {message}")]
    UnexpectedResponse {
        /// Decoding error description.
        message: String,
    },
}

impl PlatformError {
    /// Returns whether re-issuing the failed request may succeed.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::RateLimited { retry_after } => RetryPolicy::Retryable {
                after: *retry_after,
            },
            Self::Timeout | Self::Network { .. } => RetryPolicy::Retryable { after: None },
            Self::Api { status, .. } if *status >= 500 => RetryPolicy::Retryable { after: None },
            Self::NotFound { .. }
            | Self::Authentication { .. }
            | Self::Api { .. }
            | Self::UnexpectedResponse { .. } => RetryPolicy::NonRetryable,
        }
    }

    /// Returns `true` for [`PlatformError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// The configuration artifact could not be classified.
///
/// Only fetch faults end up here; every content problem is a
/// [`crate::ComplianceVerdict`] instead.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// Fetching the file failed for a reason other than "not found".
    #[error("failed to fetch configuration file: {0}")]
    Fetch(#[from] PlatformError),
}

// ---------------------------------------------------------------------------
// Template errors
// ---------------------------------------------------------------------------

/// Failures loading or rendering an issue/comment body template.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// The template file does not exist or could not be read.
    #[error("template '{name}' could not be read: {message}")]
    Unreadable {
        /// Template file name.
        name: TemplateName,
        /// I/O error description.
        message: String,
    },

    /// The renderer has no template registered under this name.
    #[error("template '{name}' is not loaded")]
    NotLoaded {
        /// Template file name.
        name: TemplateName,
    },

    /// A `{{` or `{#` was never closed.
    #[error("template '{name}' has an unterminated tag at byte {offset}")]
    UnterminatedTag {
        /// Template file name.
        name: TemplateName,
        /// Byte offset of the opening delimiter.
        offset: usize,
    },

    /// The template references a variable the render context does not supply.
    #[error("template '{name}' references unknown variable '{variable}'")]
    UnknownVariable {
        /// Template file name.
        name: TemplateName,
        /// The variable as written in the template.
        variable: String,
    },

    /// The template uses `{% ... %}` block syntax, which is not supported.
    #[error("template '{name}' uses unsupported block tag at byte {offset}")]
    UnsupportedBlock {
        /// Template file name.
        name: TemplateName,
        /// Byte offset of the opening delimiter.
        offset: usize,
    },
}

// ---------------------------------------------------------------------------
// Audit-level errors
// ---------------------------------------------------------------------------

/// Errors that stop an audit run.
///
/// These are distinct from per-repository faults in that the scan cannot
/// meaningfully proceed (or start) when they occur.
#[derive(Debug, Error)]
pub enum AuditError {
    /// No credential was supplied.
    #[error("missing credential: set PAT or pass --token")]
    MissingCredential,

    /// No organisation was supplied.
    #[error("missing organisation: set ORG or pass --org")]
    MissingOrganization,

    /// The runtime configuration is invalid.
    ///
    /// Produced at load time; a scan never starts with an invalid config.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },

    /// A body template failed to load.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// The organisation's repositories could not be listed at all.
    #[error("failed to list repositories: {0}")]
    Listing(#[source] PlatformError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_retryable_after_requested_delay() {
        let err = PlatformError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(
            err.retry_policy(),
            RetryPolicy::Retryable {
                after: Some(Duration::from_secs(7))
            }
        );
    }

    #[test]
    fn server_errors_are_retryable_client_errors_are_not() {
        let server = PlatformError::Api {
            status: 502,
            message: "bad gateway".to_string(),
        };
        let client = PlatformError::Api {
            status: 422,
            message: "validation failed".to_string(),
        };
        assert_eq!(server.retry_policy(), RetryPolicy::Retryable { after: None });
        assert_eq!(client.retry_policy(), RetryPolicy::NonRetryable);
    }

    #[test]
    fn not_found_is_never_retried() {
        let err = PlatformError::NotFound {
            resource: "acme/alpha".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.retry_policy(), RetryPolicy::NonRetryable);
    }
}
