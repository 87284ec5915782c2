//! Immutable audit configuration.
//!
//! Built once at startup by the composition root and shared by reference (or
//! `Arc`) with the scanner and reconciler. Nothing in the core reads ambient
//! process state.

use std::path::PathBuf;
use std::time::Duration;

use crate::{ArtifactPath, AuditError, OrganizationName, TemplateName};

/// Default title of the tracking issue; also its deduplication key.
pub const DEFAULT_TRACKING_TITLE: &str = "Missing or invalid pre-commit configuration";

/// Default path of the configuration file checked in every repository.
pub const DEFAULT_CONFIG_FILENAME: &str = ".pre-commit-config.yaml";

/// Default template for new tracking issue bodies.
pub const DEFAULT_OPEN_TEMPLATE: &str = "open-issue.j2";

/// Default template for the comment left when closing a tracking issue.
pub const DEFAULT_CLOSE_TEMPLATE: &str = "close-issue.j2";

/// Default directory template names are resolved against.
pub const DEFAULT_TEMPLATES_DIR: &str = "templates";

/// Default pause between consecutive repository checks.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(3);

/// Longest accepted spacing between repository checks.
pub const MAX_DELAY: Duration = Duration::from_secs(60 * 60);

/// Largest accepted worker count.
pub const MAX_CONCURRENCY: usize = 64;

/// Process-wide, read-only settings for one audit run.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditConfig {
    /// Organisation whose repositories are audited.
    pub organization: OrganizationName,
    /// Exact (case-sensitive) title identifying tracking issues.
    pub tracking_title: String,
    /// Path of the pre-commit configuration within each repository.
    pub config_path: ArtifactPath,
    /// Template rendered into new tracking issue bodies.
    pub open_template: TemplateName,
    /// Template rendered into the comment left when closing.
    pub close_template: TemplateName,
    /// Directory template names are resolved against.
    pub templates_dir: PathBuf,
    /// When set, every write is computed and logged but never sent.
    pub dry_run: bool,
    /// Minimum spacing between the start of consecutive repository checks.
    pub delay: Duration,
    /// Maximum number of repositories reconciled at once.
    pub concurrency: usize,
}

impl AuditConfig {
    /// Creates a configuration for `organization` with every other setting at
    /// its default. Dry run is on by default.
    pub fn new(organization: OrganizationName) -> Self {
        Self {
            organization,
            tracking_title: DEFAULT_TRACKING_TITLE.to_string(),
            config_path: ArtifactPath::new(DEFAULT_CONFIG_FILENAME)
                .expect("default config filename is non-empty"),
            open_template: TemplateName::new(DEFAULT_OPEN_TEMPLATE)
                .expect("default template name is non-empty"),
            close_template: TemplateName::new(DEFAULT_CLOSE_TEMPLATE)
                .expect("default template name is non-empty"),
            templates_dir: PathBuf::from(DEFAULT_TEMPLATES_DIR),
            dry_run: true,
            delay: DEFAULT_DELAY,
            concurrency: 1,
        }
    }

    #[must_use]
    pub fn with_tracking_title(mut self, title: impl Into<String>) -> Self {
        self.tracking_title = title.into();
        self
    }

    #[must_use]
    pub fn with_config_path(mut self, path: ArtifactPath) -> Self {
        self.config_path = path;
        self
    }

    #[must_use]
    pub fn with_templates(mut self, open: TemplateName, close: TemplateName) -> Self {
        self.open_template = open;
        self.close_template = close;
        self
    }

    #[must_use]
    pub fn with_templates_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.templates_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Checks invariants that the type system does not enforce.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::ConfigurationError`] if the tracking title is
    /// blank, the concurrency is outside `1..=MAX_CONCURRENCY`, or the delay
    /// exceeds [`MAX_DELAY`].
    pub fn validate(&self) -> Result<(), AuditError> {
        if self.tracking_title.trim().is_empty() {
            return Err(AuditError::ConfigurationError {
                message: "tracking issue title must not be blank".to_string(),
            });
        }
        if !(1..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(AuditError::ConfigurationError {
                message: format!(
                    "concurrency must be between 1 and {MAX_CONCURRENCY}, got {}",
                    self.concurrency
                ),
            });
        }
        if self.delay > MAX_DELAY {
            return Err(AuditError::ConfigurationError {
                message: format!(
                    "delay must be at most {}s, got {}s",
                    MAX_DELAY.as_secs(),
                    self.delay.as_secs()
                ),
            });
        }
        Ok(())
    }
}
