//! Organisation-wide scan.
//!
//! [`OrgScanner::scan`] walks the organisation's repository listing page by
//! page (never assuming it fits in one page) and reconciles each repository on
//! a bounded pool of tokio tasks. Repositories are independent, so ordering of
//! log output across repositories is not guaranteed; the returned
//! [`ScanReport`] is always in listing order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use compliance::{
    AuditConfig, AuditError, ComplianceVerdict, HostingPlatform, NoOpReason, OrganizationName,
    PageCursor, PlatformError, ReconciliationAction, RepositoryId, ScanRunId, TemplateRenderer,
    Timestamp,
};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::pacer::Pacer;
use crate::reconcile::{ComplianceReconciler, Execution, ReconcileError, ReconciliationOutcome};

/// Result of reconciling one repository.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryReport {
    pub repository: RepositoryId,
    pub result: Result<ReconciliationOutcome, ReconcileError>,
}

/// Aggregate counts over a [`ScanReport`].
///
/// `archived` and `issues_disabled` together are the skipped repositories;
/// the latter are also counted as non-compliant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanTotals {
    pub repositories: usize,
    pub compliant: usize,
    pub non_compliant: usize,
    pub archived: usize,
    pub issues_disabled: usize,
    pub issues_created: usize,
    pub issues_closed: usize,
    pub failed: usize,
}

impl std::fmt::Display for ScanTotals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} repositories: {} compliant, {} non-compliant, {} archived, {} without issues, {} issue(s) created, {} issue(s) closed, {} failed",
            self.repositories,
            self.compliant,
            self.non_compliant,
            self.archived,
            self.issues_disabled,
            self.issues_created,
            self.issues_closed,
            self.failed
        )
    }
}

/// Everything one scan did, in listing order.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub run_id: ScanRunId,
    pub organization: OrganizationName,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub repositories: Vec<RepositoryReport>,
    /// Set when a page after the first could not be listed; the repositories
    /// listed before it were still reconciled.
    pub listing_error: Option<PlatformError>,
    /// Set when the scan stopped early because of cancellation.
    pub cancelled: bool,
}

impl ScanReport {
    pub fn totals(&self) -> ScanTotals {
        let mut totals = ScanTotals {
            repositories: self.repositories.len(),
            ..ScanTotals::default()
        };
        for report in &self.repositories {
            let outcome = match &report.result {
                Ok(outcome) => outcome,
                Err(_) => {
                    totals.failed += 1;
                    continue;
                }
            };
            match outcome.verdict {
                None => totals.archived += 1,
                Some(ComplianceVerdict::Compliant) => totals.compliant += 1,
                Some(_) => totals.non_compliant += 1,
            }
            match (&outcome.action, &outcome.execution) {
                (ReconciliationAction::NoOp { reason: NoOpReason::IssuesDisabled }, _) => {
                    totals.issues_disabled += 1;
                }
                (ReconciliationAction::CreateIssue, Execution::Created { .. }) => {
                    totals.issues_created += 1;
                }
                (ReconciliationAction::CloseIssues { .. }, Execution::Closed { issues, failed }) => {
                    totals.issues_closed += issues.len();
                    if !failed.is_empty() {
                        totals.failed += 1;
                    }
                }
                (_, Execution::Failed { .. }) => totals.failed += 1,
                _ => {}
            }
        }
        totals
    }
}

/// Reconciles every repository of the configured organisation.
pub struct OrgScanner<P: ?Sized = dyn HostingPlatform> {
    platform: Arc<P>,
    reconciler: Arc<ComplianceReconciler<P>>,
    config: Arc<AuditConfig>,
    pacer: Arc<Pacer>,
}

impl<P> OrgScanner<P>
where
    P: HostingPlatform + ?Sized + 'static,
{
    pub fn new(
        platform: Arc<P>,
        renderer: Arc<dyn TemplateRenderer>,
        config: Arc<AuditConfig>,
    ) -> Self {
        let reconciler = Arc::new(ComplianceReconciler::new(
            Arc::clone(&platform),
            renderer,
            Arc::clone(&config),
        ));
        let pacer = Arc::new(Pacer::new(config.delay));
        Self {
            platform,
            reconciler,
            config,
            pacer,
        }
    }

    /// Scans the organisation until the listing is exhausted or `cancel` is
    /// triggered.
    ///
    /// Cancellation stops dispatching new reconciliations; reconciliations
    /// already running are awaited so no repository is left with a comment
    /// posted but its issue still open.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Listing`] only if the first page of repositories
    /// cannot be listed. Every later fault is recorded in the report.
    pub async fn scan(&self, cancel: &CancellationToken) -> Result<ScanReport, AuditError> {
        let run_id = ScanRunId::new_random();
        let span = info_span!("scan", run = %run_id, organization = %self.config.organization);
        self.run(run_id, cancel).instrument(span).await
    }

    async fn run(&self, run_id: ScanRunId, cancel: &CancellationToken) -> Result<ScanReport, AuditError> {
        let started_at = Timestamp::now();
        let organization = &self.config.organization;
        info!(
            dry_run = self.config.dry_run,
            concurrency = self.config.concurrency,
            delay_ms = self.pacer.interval().as_millis() as u64,
            "scanning organization {organization}"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks = JoinSet::new();
        let mut finished: Vec<(usize, RepositoryReport)> = Vec::new();
        let mut dispatched: HashMap<task::Id, (usize, RepositoryId)> = HashMap::new();
        let mut seen: HashSet<RepositoryId> = HashSet::new();
        let mut listing_error = None;
        let mut cancelled = false;
        let mut slot = 0usize;
        let mut cursor = Some(PageCursor::first());

        'pages: while let Some(page_cursor) = cursor {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let page = match self.platform.list_repositories(organization, page_cursor).await {
                Ok(page) => page,
                Err(err) if page_cursor == PageCursor::first() => {
                    error!(error = %err, "failed to list repositories");
                    return Err(AuditError::Listing(err));
                }
                Err(err) => {
                    error!(page = page_cursor.page(), error = %err, "failed to list further repositories; stopping");
                    listing_error = Some(err);
                    break;
                }
            };
            cursor = page.next;

            for repository in page.items {
                if !seen.insert(repository.id.clone()) {
                    warn!(repository = %repository.id, "repository listed twice; skipping duplicate");
                    continue;
                }
                if cancel.is_cancelled() {
                    cancelled = true;
                    break 'pages;
                }

                let index = slot;
                slot += 1;

                if repository.archived {
                    // No API calls, so no pacing slot and no worker.
                    let result = self.reconciler.reconcile(&repository).await;
                    finished.push((index, report(repository.id, result)));
                    continue;
                }

                let permit = tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
                };
                let Some(permit) = permit else {
                    cancelled = true;
                    break 'pages;
                };

                let paced = tokio::select! {
                    biased;
                    () = cancel.cancelled() => false,
                    () = self.pacer.acquire() => true,
                };
                if !paced {
                    cancelled = true;
                    break 'pages;
                }

                let reconciler = Arc::clone(&self.reconciler);
                let repository_id = repository.id.clone();
                let handle = tasks.spawn(
                    async move {
                        let _permit = permit;
                        let result = reconciler.reconcile(&repository).await;
                        (index, report(repository.id, result))
                    }
                    .in_current_span(),
                );
                dispatched.insert(handle.id(), (index, repository_id));
            }
        }

        if cancelled {
            warn!(in_flight = tasks.len(), "scan cancelled; waiting for in-flight repositories");
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(done) => finished.push(done),
                Err(err) => {
                    // A task that never returned keeps its place in the report.
                    let Some((index, repository)) = dispatched.remove(&err.id()) else {
                        error!(error = %err, "reconciliation task did not complete");
                        continue;
                    };
                    error!(repository = %repository, error = %err, "reconciliation task did not complete");
                    let result = Err(ReconcileError::Aborted {
                        repository: repository.clone(),
                        message: err.to_string(),
                    });
                    finished.push((index, RepositoryReport { repository, result }));
                }
            }
        }

        finished.sort_by_key(|(index, _)| *index);
        let report = ScanReport {
            run_id,
            organization: organization.clone(),
            started_at,
            finished_at: Timestamp::now(),
            repositories: finished.into_iter().map(|(_, report)| report).collect(),
            listing_error,
            cancelled,
        };
        info!("scan finished: {}", report.totals());
        Ok(report)
    }
}

fn report(
    repository: RepositoryId,
    result: Result<ReconciliationOutcome, ReconcileError>,
) -> RepositoryReport {
    if let Err(err) = &result {
        warn!(repository = %repository, error = %err, "reconciliation failed; skipping repository");
    }
    RepositoryReport { repository, result }
}
