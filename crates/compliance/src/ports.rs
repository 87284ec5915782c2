//! Port traits implemented by infrastructure crates.
//!
//! The hosting platform is split into narrow capabilities so a test double
//! only implements what the core actually calls. [`HostingPlatform`] bundles
//! them for wiring and is implemented automatically for any type providing all
//! three.

use async_trait::async_trait;

use crate::{
    ArtifactPath, CloseReason, FileContent, IssueNumber, OrganizationName, Page, PageCursor,
    PlatformError, RepositoryId, RepositoryRef, TemplateError, TemplateName, TrackingIssue,
};

/// Lists the repositories of an organisation.
#[async_trait]
pub trait RepositoryCatalog: Send + Sync {
    /// Returns one page of the organisation's repositories, in platform order.
    async fn list_repositories(
        &self,
        organization: &OrganizationName,
        cursor: PageCursor,
    ) -> Result<Page<RepositoryRef>, PlatformError>;
}

/// Reads files from a repository's default branch.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetches the file at `path`.
    ///
    /// # Errors
    ///
    /// Must return [`PlatformError::NotFound`] (and only that variant) when
    /// the file does not exist.
    async fn fetch_file(
        &self,
        repository: &RepositoryId,
        path: &ArtifactPath,
    ) -> Result<FileContent, PlatformError>;
}

/// Reads and writes a repository's issues.
#[async_trait]
pub trait IssueStore: Send + Sync {
    /// Returns one page of the repository's open issues (pull requests
    /// excluded).
    async fn list_open_issues(
        &self,
        repository: &RepositoryId,
        cursor: PageCursor,
    ) -> Result<Page<TrackingIssue>, PlatformError>;

    /// Opens a new issue and returns its number.
    async fn create_issue(
        &self,
        repository: &RepositoryId,
        title: &str,
        body: &str,
    ) -> Result<IssueNumber, PlatformError>;

    /// Appends a comment to an issue.
    async fn add_comment(
        &self,
        repository: &RepositoryId,
        issue: IssueNumber,
        body: &str,
    ) -> Result<(), PlatformError>;

    /// Transitions an issue to closed with the given reason.
    async fn close_issue(
        &self,
        repository: &RepositoryId,
        issue: IssueNumber,
        reason: CloseReason,
    ) -> Result<(), PlatformError>;
}

/// Everything the audit needs from the hosting platform.
pub trait HostingPlatform: RepositoryCatalog + ContentSource + IssueStore {}

impl<T> HostingPlatform for T where T: RepositoryCatalog + ContentSource + IssueStore {}

/// Values available to body templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContext {
    /// Bare repository name (e.g. `"alpha"`).
    pub repository: String,
    /// Path of the configuration file (e.g. `".pre-commit-config.yaml"`).
    pub filename: String,
}

impl TemplateContext {
    /// Looks up a variable by the name used inside `{{ ... }}`.
    pub fn lookup(&self, variable: &str) -> Option<&str> {
        match variable {
            "repository" => Some(&self.repository),
            "filename" => Some(&self.filename),
            _ => None,
        }
    }
}

/// Renders a named template into issue or comment text.
///
/// Missing templates and render faults must surface as errors; a renderer
/// never substitutes a fallback body.
pub trait TemplateRenderer: Send + Sync {
    fn render(
        &self,
        template: &TemplateName,
        context: &TemplateContext,
    ) -> Result<String, TemplateError>;
}
