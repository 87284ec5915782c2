//! Core domain for the pre-commit compliance audit.
//!
//! This crate contains every domain concept, newtype identifier, shared value
//! type, and error type used throughout the audit. Infrastructure crates
//! implement the traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`RepositoryId`, `IssueNumber`, etc.) |
//! | [`types`] | Shared value types (`ConfigArtifact`, `ComplianceVerdict`, etc.) |
//! | [`errors`] | Error and retry-policy types |
//! | [`config`] | The immutable [`AuditConfig`] |
//! | [`validator`] | Pure classification of a configuration artifact |
//! | [`ports`] | Hosting platform and template renderer traits |

pub mod config;
pub mod errors;
pub mod identifiers;
pub mod ports;
pub mod types;
pub mod validator;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{
    AuditConfig, DEFAULT_CLOSE_TEMPLATE, DEFAULT_CONFIG_FILENAME, DEFAULT_DELAY,
    DEFAULT_OPEN_TEMPLATE, DEFAULT_TEMPLATES_DIR, DEFAULT_TRACKING_TITLE, MAX_CONCURRENCY,
    MAX_DELAY,
};
pub use errors::{AuditError, PlatformError, RetryPolicy, TemplateError, ValidationError};
pub use identifiers::{ArtifactPath, IssueNumber, OrganizationName, RepositoryId, ScanRunId, TemplateName};
pub use ports::{
    ContentSource, HostingPlatform, IssueStore, RepositoryCatalog, TemplateContext,
    TemplateRenderer,
};
pub use types::{
    CloseReason, ComplianceVerdict, ConfigArtifact, ContentEncoding, FileContent, IssueState,
    NoOpReason, Page, PageCursor, ReconciliationAction, RepositoryRef, Timestamp, TrackingIssue,
};
pub use validator::validate;
