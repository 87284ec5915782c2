//! Per-repository compliance reconciliation.
//!
//! Desired state: an open tracking issue exists iff the repository's
//! pre-commit configuration is not compliant. [`ComplianceReconciler::reconcile`]
//! compares that against ground truth and issues the minimal corrective action.
//!
//! ```text
//! archived ──────────────────────────────────────────────► NoOp(Archived)
//! compliant     ─┬─ tracking issue open ─────────────────► CloseIssues
//!                └─ none ────────────────────────────────► NoOp(Compliant)
//! non-compliant ─┬─ issues disabled ─────────────────────► NoOp(IssuesDisabled)
//!                ├─ tracking issue open ─────────────────► NoOp(AlreadyTracked)
//!                └─ none ────────────────────────────────► CreateIssue
//! ```
//!
//! The reconciler holds no state between repositories.

use std::sync::Arc;

use compliance::{
    validate, AuditConfig, ComplianceVerdict, ConfigArtifact, HostingPlatform, IssueNumber,
    NoOpReason, PlatformError, ReconciliationAction, RepositoryId, RepositoryRef, TemplateContext,
    TemplateError, TemplateName, TemplateRenderer, ValidationError,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};

use crate::tracker::{IssueCreation, IssueTracker};

/// Per-repository faults that prevent a decision.
///
/// The scanner logs these and moves on to the next repository.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReconcileError {
    /// The configuration file could not be fetched.
    #[error("{repository}: {source}")]
    Validation {
        repository: RepositoryId,
        #[source]
        source: ValidationError,
    },

    /// The open issues could not be listed.
    #[error("{repository}: failed to list open issues: {source}")]
    ListIssues {
        repository: RepositoryId,
        #[source]
        source: PlatformError,
    },

    /// An issue or comment body could not be rendered.
    #[error("{repository}: {source}")]
    Template {
        repository: RepositoryId,
        #[source]
        source: TemplateError,
    },

    /// The reconciliation task panicked or was aborted before returning.
    #[error("{repository}: reconciliation did not complete: {message}")]
    Aborted {
        repository: RepositoryId,
        message: String,
    },
}

/// Whether (and how) the decided action was carried out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum Execution {
    /// The action was a no-op.
    NotRequired,
    /// Dry run; the action was logged but not sent.
    DryRun,
    /// A tracking issue was opened.
    Created { issue: IssueNumber },
    /// Tracking issues were closed; `failed` lists those whose comment or
    /// close call failed.
    Closed {
        issues: Vec<IssueNumber>,
        failed: Vec<IssueNumber>,
    },
    /// The write was attempted and rejected by the platform.
    Failed { message: String },
}

/// What a reconciliation decided and did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationOutcome {
    pub repository: RepositoryId,
    /// `None` for archived repositories, which are never fetched.
    pub verdict: Option<ComplianceVerdict>,
    pub action: ReconciliationAction,
    pub execution: Execution,
}

impl ReconciliationOutcome {
    fn no_op(repository: &RepositoryRef, verdict: Option<ComplianceVerdict>, reason: NoOpReason) -> Self {
        Self {
            repository: repository.id.clone(),
            verdict,
            action: ReconciliationAction::NoOp { reason },
            execution: Execution::NotRequired,
        }
    }

    /// Human-readable status line.
    pub fn summary(&self) -> String {
        let state = match self.verdict {
            None => String::new(),
            Some(ComplianceVerdict::Compliant) => "compliant; ".to_string(),
            Some(verdict) => format!("non-compliant ({}); ", verdict.describe()),
        };
        let outcome = match (&self.action, &self.execution) {
            (ReconciliationAction::NoOp { reason }, _) => reason.describe().to_string(),
            (ReconciliationAction::CreateIssue, Execution::DryRun) => {
                "[dry-run] would create tracking issue".to_string()
            }
            (ReconciliationAction::CreateIssue, Execution::Created { issue }) => {
                format!("issue created: {}{issue}", self.repository)
            }
            (ReconciliationAction::CloseIssues { count }, Execution::DryRun) => {
                format!("[dry-run] would close {count} tracking issue(s)")
            }
            (ReconciliationAction::CloseIssues { count }, Execution::Closed { issues, failed }) => {
                let closed: Vec<String> = issues.iter().map(|n| format!("{}{n}", self.repository)).collect();
                if failed.is_empty() {
                    format!("{count} issue(s) closed: {}", closed.join(", "))
                } else {
                    format!(
                        "{count} issue(s) closed: {}; {} failed",
                        closed.join(", "),
                        failed.len()
                    )
                }
            }
            (action, Execution::Failed { message }) => format!("{action} failed: {message}"),
            (action, _) => action.to_string(),
        };
        format!("{state}{outcome}")
    }
}

/// Reconciles one repository at a time against the configured desired state.
pub struct ComplianceReconciler<P: ?Sized = dyn HostingPlatform> {
    platform: Arc<P>,
    renderer: Arc<dyn TemplateRenderer>,
    config: Arc<AuditConfig>,
}

impl<P> ComplianceReconciler<P>
where
    P: HostingPlatform + ?Sized,
{
    pub fn new(
        platform: Arc<P>,
        renderer: Arc<dyn TemplateRenderer>,
        config: Arc<AuditConfig>,
    ) -> Self {
        Self {
            platform,
            renderer,
            config,
        }
    }

    /// Decides and (unless dry run) applies the corrective action for one
    /// repository.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] when the configuration cannot be fetched
    /// (other than "not found"), the open issues cannot be listed, or a body
    /// template fails to render. Write failures are not errors; they are
    /// reported through [`Execution::Failed`].
    pub async fn reconcile(
        &self,
        repository: &RepositoryRef,
    ) -> Result<ReconciliationOutcome, ReconcileError> {
        let span = info_span!("reconcile", repository = %repository.id);
        async {
            let outcome = self.decide_and_apply(repository).await?;
            info!(
                verdict = ?outcome.verdict,
                action = %outcome.action,
                dry_run = self.config.dry_run,
                "{}: {}",
                repository.id,
                outcome.summary()
            );
            Ok::<_, ReconcileError>(outcome)
        }
        .instrument(span)
        .await
    }

    async fn decide_and_apply(
        &self,
        repository: &RepositoryRef,
    ) -> Result<ReconciliationOutcome, ReconcileError> {
        if repository.archived {
            return Ok(ReconciliationOutcome::no_op(repository, None, NoOpReason::Archived));
        }

        let fetched = self
            .platform
            .fetch_file(&repository.id, &self.config.config_path)
            .await;
        let verdict = validate(&ConfigArtifact::from_fetch(fetched)).map_err(|source| {
            ReconcileError::Validation {
                repository: repository.id.clone(),
                source,
            }
        })?;

        if verdict.is_compliant() {
            self.resolve(repository, verdict).await
        } else {
            self.track(repository, verdict).await
        }
    }

    /// Compliant: close whatever tracking issues are still open.
    async fn resolve(
        &self,
        repository: &RepositoryRef,
        verdict: ComplianceVerdict,
    ) -> Result<ReconciliationOutcome, ReconcileError> {
        if !repository.issues_enabled {
            return Ok(ReconciliationOutcome::no_op(repository, Some(verdict), NoOpReason::Compliant));
        }

        let tracker = self.tracker();
        let title = &self.config.tracking_title;
        if !tracker
            .has_tracking_issue(&repository.id, title)
            .await
            .map_err(|source| self.list_error(repository, source))?
        {
            return Ok(ReconciliationOutcome::no_op(repository, Some(verdict), NoOpReason::Compliant));
        }

        let comment = self.render(repository, &self.config.close_template)?;
        let summary = tracker
            .close_tracking_issues(&repository.id, title, &comment)
            .await
            .map_err(|source| self.list_error(repository, source))?;

        let (count, execution) = if summary.dry_run {
            (summary.matched, Execution::DryRun)
        } else if summary.closed.is_empty() && !summary.failed.is_empty() {
            (
                0,
                Execution::Failed {
                    message: format!("{} issue(s) could not be closed", summary.failed.len()),
                },
            )
        } else {
            (
                summary.count(),
                Execution::Closed {
                    issues: summary.closed,
                    failed: summary.failed,
                },
            )
        };

        Ok(ReconciliationOutcome {
            repository: repository.id.clone(),
            verdict: Some(verdict),
            action: ReconciliationAction::CloseIssues { count },
            execution,
        })
    }

    /// Non-compliant: make sure exactly one tracking issue is open.
    async fn track(
        &self,
        repository: &RepositoryRef,
        verdict: ComplianceVerdict,
    ) -> Result<ReconciliationOutcome, ReconcileError> {
        if !repository.issues_enabled {
            warn!(repository = %repository.id, %verdict, "repository doesn't support issues");
            return Ok(ReconciliationOutcome::no_op(
                repository,
                Some(verdict),
                NoOpReason::IssuesDisabled,
            ));
        }

        let tracker = self.tracker();
        let title = &self.config.tracking_title;
        if tracker
            .has_tracking_issue(&repository.id, title)
            .await
            .map_err(|source| self.list_error(repository, source))?
        {
            return Ok(ReconciliationOutcome::no_op(
                repository,
                Some(verdict),
                NoOpReason::AlreadyTracked,
            ));
        }

        let body = self.render(repository, &self.config.open_template)?;
        let execution = match tracker.create_tracking_issue(repository, title, &body).await {
            IssueCreation::Created { issue } => Execution::Created { issue },
            IssueCreation::DryRun => Execution::DryRun,
            IssueCreation::Failed { message } => Execution::Failed { message },
            IssueCreation::IssuesDisabled => {
                return Ok(ReconciliationOutcome::no_op(
                    repository,
                    Some(verdict),
                    NoOpReason::IssuesDisabled,
                ));
            }
        };

        Ok(ReconciliationOutcome {
            repository: repository.id.clone(),
            verdict: Some(verdict),
            action: ReconciliationAction::CreateIssue,
            execution,
        })
    }

    fn tracker(&self) -> IssueTracker<'_, P> {
        IssueTracker::new(self.platform.as_ref(), self.config.dry_run)
    }

    fn render(
        &self,
        repository: &RepositoryRef,
        template: &TemplateName,
    ) -> Result<String, ReconcileError> {
        let context = TemplateContext {
            repository: repository.id.name().to_string(),
            filename: self.config.config_path.to_string(),
        };
        self.renderer
            .render(template, &context)
            .map_err(|source| ReconcileError::Template {
                repository: repository.id.clone(),
                source,
            })
    }

    fn list_error(&self, repository: &RepositoryRef, source: PlatformError) -> ReconcileError {
        ReconcileError::ListIssues {
            repository: repository.id.clone(),
            source,
        }
    }
}
