//! Tracking-issue lookup, creation, and closing.
//!
//! A tracking issue is an OPEN issue whose title equals the configured title
//! exactly (case-sensitive, no substring matching). Every lookup walks the
//! repository's open issues afresh; nothing is cached between calls because
//! the issue list can change underneath us.
//!
//! Write failures are caught and logged here, never propagated: one
//! repository's failing write must not abort the scan. Read failures (listing
//! issues) are returned to the caller.

use compliance::{
    CloseReason, IssueNumber, IssueState, IssueStore, PageCursor, PlatformError, RepositoryId,
    RepositoryRef, TrackingIssue,
};
use serde::Serialize;
use tracing::{error, info, warn};

/// Result of [`IssueTracker::create_tracking_issue`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum IssueCreation {
    /// One new open issue exists.
    Created { issue: IssueNumber },
    /// The repository's issue tracker is disabled; nothing was sent.
    IssuesDisabled,
    /// Dry run; nothing was sent.
    DryRun,
    /// The platform rejected the request.
    Failed { message: String },
}

impl IssueCreation {
    /// The created issue, if any.
    pub fn issue(&self) -> Option<IssueNumber> {
        match self {
            Self::Created { issue } => Some(*issue),
            _ => None,
        }
    }
}

/// Result of [`IssueTracker::close_tracking_issues`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CloseSummary {
    /// Open tracking issues found.
    pub matched: usize,
    /// Issues that were both commented on and closed.
    pub closed: Vec<IssueNumber>,
    /// Issues where the comment or the close call failed.
    pub failed: Vec<IssueNumber>,
    /// Set when nothing was sent because of dry run.
    pub dry_run: bool,
}

impl CloseSummary {
    /// Number of issues for which both the comment and the close succeeded.
    pub fn count(&self) -> usize {
        self.closed.len()
    }
}

/// Finds, opens, and closes tracking issues in one repository at a time.
///
/// Borrows the issue store so it can be built per reconciliation without
/// reference counting.
pub struct IssueTracker<'a, S: ?Sized> {
    store: &'a S,
    dry_run: bool,
}

impl<'a, S> IssueTracker<'a, S>
where
    S: IssueStore + ?Sized,
{
    pub fn new(store: &'a S, dry_run: bool) -> Self {
        Self { store, dry_run }
    }

    /// Returns every open issue titled exactly `title`, across all pages.
    ///
    /// # Errors
    ///
    /// Returns the first [`PlatformError`] raised while listing issues.
    pub async fn find_tracking_issues(
        &self,
        repository: &RepositoryId,
        title: &str,
    ) -> Result<Vec<TrackingIssue>, PlatformError> {
        self.walk(repository, title, false).await
    }

    /// Returns `true` iff at least one open issue is titled exactly `title`.
    ///
    /// Stops listing at the first match.
    ///
    /// # Errors
    ///
    /// Returns the first [`PlatformError`] raised while listing issues.
    pub async fn has_tracking_issue(
        &self,
        repository: &RepositoryId,
        title: &str,
    ) -> Result<bool, PlatformError> {
        Ok(!self.walk(repository, title, true).await?.is_empty())
    }

    async fn walk(
        &self,
        repository: &RepositoryId,
        title: &str,
        stop_at_first: bool,
    ) -> Result<Vec<TrackingIssue>, PlatformError> {
        let mut found = Vec::new();
        let mut cursor = Some(PageCursor::first());
        while let Some(page_cursor) = cursor {
            let page = self.store.list_open_issues(repository, page_cursor).await?;
            for issue in page.items {
                if issue.state == IssueState::Open && issue.title == title {
                    found.push(issue);
                    if stop_at_first {
                        return Ok(found);
                    }
                }
            }
            cursor = page.next;
        }
        Ok(found)
    }

    /// Opens one tracking issue.
    ///
    /// Never fails: a disabled tracker, dry run, or platform error yields a
    /// non-`Created` result, and platform errors are logged at error level.
    pub async fn create_tracking_issue(
        &self,
        repository: &RepositoryRef,
        title: &str,
        body: &str,
    ) -> IssueCreation {
        if !repository.issues_enabled {
            warn!(repository = %repository.id, "repository doesn't support issues");
            return IssueCreation::IssuesDisabled;
        }
        if self.dry_run {
            info!(repository = %repository.id, dry_run = true, title, "[dry-run] would create tracking issue");
            return IssueCreation::DryRun;
        }
        match self.store.create_issue(&repository.id, title, body).await {
            Ok(issue) => {
                info!(repository = %repository.id, %issue, "created tracking issue {}{}", repository.id, issue);
                IssueCreation::Created { issue }
            }
            Err(err) => {
                error!(repository = %repository.id, error = %err, "failed to create tracking issue");
                IssueCreation::Failed {
                    message: err.to_string(),
                }
            }
        }
    }

    /// Comments on and closes every open tracking issue.
    ///
    /// A failure on one issue is logged and the next issue is still processed.
    /// [`CloseSummary::count`] counts only issues where both calls succeeded.
    ///
    /// # Errors
    ///
    /// Returns a [`PlatformError`] only if listing the open issues fails.
    pub async fn close_tracking_issues(
        &self,
        repository: &RepositoryId,
        title: &str,
        comment: &str,
    ) -> Result<CloseSummary, PlatformError> {
        let issues = self.find_tracking_issues(repository, title).await?;
        let mut summary = CloseSummary {
            matched: issues.len(),
            dry_run: self.dry_run,
            ..CloseSummary::default()
        };

        for issue in issues {
            if self.dry_run {
                info!(repository = %repository, issue = %issue.number, dry_run = true, "[dry-run] would close tracking issue {}{}", repository, issue.number);
                continue;
            }
            match self.close_one(repository, issue.number, comment).await {
                Ok(()) => {
                    info!(repository = %repository, issue = %issue.number, "closed tracking issue {}{}", repository, issue.number);
                    summary.closed.push(issue.number);
                }
                Err(err) => {
                    error!(repository = %repository, issue = %issue.number, error = %err, "failed to close tracking issue");
                    summary.failed.push(issue.number);
                }
            }
        }

        Ok(summary)
    }

    async fn close_one(
        &self,
        repository: &RepositoryId,
        issue: IssueNumber,
        comment: &str,
    ) -> Result<(), PlatformError> {
        self.store.add_comment(repository, issue, comment).await?;
        self.store
            .close_issue(repository, issue, CloseReason::Completed)
            .await
    }
}
