//! Shared value types for the pre-commit compliance domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! state with invariants (a verdict is exactly one of five outcomes, a page
//! cursor is never zero) and participate in reconciliation decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{IssueNumber, PlatformError, RepositoryId};

// ---------------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------------

/// Snapshot of one repository as listed by the hosting platform.
///
/// Immutable for the duration of a reconciliation pass. Owned by the scanner
/// and passed by reference into the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    /// `"owner/name"` identifier.
    pub id: RepositoryId,
    /// Archived repositories are read-only and never reconciled.
    pub archived: bool,
    /// Whether the repository's issue tracker is enabled.
    pub issues_enabled: bool,
}

impl RepositoryRef {
    /// Creates a snapshot of an active repository with issues enabled.
    pub fn new(id: RepositoryId) -> Self {
        Self {
            id,
            archived: false,
            issues_enabled: true,
        }
    }

    /// Marks the snapshot as archived.
    #[must_use]
    pub fn archived(mut self) -> Self {
        self.archived = true;
        self
    }

    /// Marks the snapshot as having its issue tracker disabled.
    #[must_use]
    pub fn without_issues(mut self) -> Self {
        self.issues_enabled = false;
        self
    }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Opaque position within a paginated listing.
///
/// Page numbers are 1-based; every listing starts at [`PageCursor::first`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageCursor(u32);

impl PageCursor {
    /// Creates a cursor for the given 1-based page number.
    ///
    /// Returns `None` for page `0`.
    pub fn new(page: u32) -> Option<Self> {
        if page == 0 {
            None
        } else {
            Some(Self(page))
        }
    }

    /// The first page of a listing.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the 1-based page number.
    pub fn page(self) -> u32 {
        self.0
    }

    /// Returns the cursor of the following page.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// One page of a listing plus the cursor of the page after it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page, in platform order.
    pub items: Vec<T>,
    /// `None` when this is the last page.
    pub next: Option<PageCursor>,
}

// ---------------------------------------------------------------------------
// Configuration artifact
// ---------------------------------------------------------------------------

/// How the raw content of a fetched file is encoded at the source boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentEncoding {
    /// Base64, possibly wrapped across lines (the REST contents API form).
    Base64,
    /// Plain UTF-8 text.
    Utf8,
}

/// Raw file content as returned by the hosting platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    /// Size of the decoded file in bytes, as reported by the platform.
    pub size: u64,
    /// Content exactly as received, before decoding.
    pub raw: String,
    /// Encoding applied to `raw`.
    pub encoding: ContentEncoding,
}

/// Outcome of fetching a repository's pre-commit configuration file.
///
/// Created transiently per repository check; never persisted.
#[derive(Debug, Clone)]
pub enum ConfigArtifact {
    /// The file exists; its metadata and raw content.
    Found(FileContent),
    /// The platform reported that no file exists at the path.
    NotFound,
    /// The fetch failed for any reason other than "not found".
    FetchFailed(PlatformError),
}

impl ConfigArtifact {
    /// Classifies a raw fetch result, moving the platform's "not found" signal
    /// out of the error channel.
    pub fn from_fetch(result: Result<FileContent, PlatformError>) -> Self {
        match result {
            Ok(content) => Self::Found(content),
            Err(PlatformError::NotFound { .. }) => Self::NotFound,
            Err(err) => Self::FetchFailed(err),
        }
    }
}

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

/// Classified result of validating a repository's pre-commit configuration.
///
/// Exactly one verdict is produced per check. Every variant other than
/// [`ComplianceVerdict::Compliant`] maps to the same remediation (an open
/// tracking issue) but each keeps its own human-facing description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceVerdict {
    /// Parses and declares at least one hook repository.
    Compliant,
    /// No file at the configured path.
    Missing,
    /// File present but at most one byte long.
    Empty,
    /// Content could not be decoded or parsed as YAML.
    MalformedYaml,
    /// Parses, but has no non-empty top-level `repos` sequence.
    InvalidSchema,
}

impl ComplianceVerdict {
    /// Returns `true` only for [`ComplianceVerdict::Compliant`].
    pub fn is_compliant(self) -> bool {
        matches!(self, Self::Compliant)
    }

    /// Short human-readable description used in status lines.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Compliant => "valid pre-commit configuration",
            Self::Missing => "pre-commit configuration is missing",
            Self::Empty => "pre-commit configuration is empty",
            Self::MalformedYaml => "pre-commit configuration is not valid YAML",
            Self::InvalidSchema => "pre-commit configuration defines no repos",
        }
    }
}

impl std::fmt::Display for ComplianceVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Compliant => "compliant",
            Self::Missing => "missing",
            Self::Empty => "empty",
            Self::MalformedYaml => "malformed_yaml",
            Self::InvalidSchema => "invalid_schema",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

/// Open/closed state of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    Open,
    Closed,
}

/// An issue whose title matches (or may match) the tracking title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingIssue {
    pub number: IssueNumber,
    pub title: String,
    pub state: IssueState,
}

/// Reason tag attached when an issue is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The tracked work is done.
    Completed,
}

impl CloseReason {
    /// Wire form used by the platform's `state_reason` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Why a reconciliation decided that nothing needed to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoOpReason {
    /// Archived repositories are skipped without any API call.
    Archived,
    /// Compliant and no tracking issue is open.
    Compliant,
    /// Non-compliant and a tracking issue is already open.
    AlreadyTracked,
    /// Non-compliant but the repository's issue tracker is disabled.
    IssuesDisabled,
}

impl NoOpReason {
    /// Human-readable status line fragment.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Archived => "repository is archived; skipping",
            Self::Compliant => "compliant; nothing to do",
            Self::AlreadyTracked => "tracking issue already exists",
            Self::IssuesDisabled => "repository doesn't support issues",
        }
    }
}

/// The corrective action a reconciliation decided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum ReconciliationAction {
    /// Desired state already holds.
    NoOp { reason: NoOpReason },
    /// Open one tracking issue.
    CreateIssue,
    /// Close every open tracking issue; `count` is the number closed (or, in a
    /// dry run, the number that would have been closed).
    CloseIssues { count: usize },
}

impl std::fmt::Display for ReconciliationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoOp { reason } => write!(f, "no-op ({})", reason.describe()),
            Self::CreateIssue => f.write_str("create issue"),
            Self::CloseIssues { count } => write!(f, "close {count} issue(s)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly; the underlying representation can change without affecting the
/// domain API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
