#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use compliance::{
    ArtifactPath, AuditConfig, CloseReason, ContentEncoding, ContentSource, FileContent,
    IssueNumber, IssueState, IssueStore, OrganizationName, Page, PageCursor, PlatformError,
    RepositoryCatalog, RepositoryId, RepositoryRef, TemplateContext, TemplateError, TemplateName,
    TemplateRenderer, TrackingIssue,
};
use tokio_util::sync::CancellationToken;

pub const TITLE: &str = "Missing or invalid pre-commit configuration";

pub const VALID_CONFIG: &str =
    "repos:\n  - repo: https://github.com/pre-commit/pre-commit-hooks\n    rev: v4.6.0\n    hooks:\n      - id: end-of-file-fixer\n";

/// Every call the fake received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListRepositories { page: u32 },
    FetchFile { repository: String, path: String },
    ListIssues { repository: String, page: u32 },
    CreateIssue { repository: String, title: String, body: String },
    AddComment { repository: String, issue: u64, body: String },
    CloseIssue { repository: String, issue: u64, reason: CloseReason },
}

impl Call {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Self::CreateIssue { .. } | Self::AddComment { .. } | Self::CloseIssue { .. }
        )
    }

    pub fn repository(&self) -> Option<&str> {
        match self {
            Self::ListRepositories { .. } => None,
            Self::FetchFile { repository, .. }
            | Self::ListIssues { repository, .. }
            | Self::CreateIssue { repository, .. }
            | Self::AddComment { repository, .. }
            | Self::CloseIssue { repository, .. } => Some(repository),
        }
    }
}

#[derive(Default)]
struct State {
    repositories: Vec<RepositoryRef>,
    files: HashMap<RepositoryId, FileContent>,
    fetch_errors: HashMap<RepositoryId, PlatformError>,
    issues: HashMap<RepositoryId, Vec<TrackingIssue>>,
    next_issue: u64,
    calls: Vec<Call>,
    failing_creates: HashSet<RepositoryId>,
    failing_closes: HashSet<(RepositoryId, u64)>,
    failing_comments: HashSet<(RepositoryId, u64)>,
    failing_issue_listings: HashSet<RepositoryId>,
    failing_repository_page: Option<u32>,
    cancel_on_fetch: Option<(RepositoryId, CancellationToken)>,
    panic_on_fetch: HashSet<RepositoryId>,
}

/// In-memory hosting platform that records every call.
pub struct FakePlatform {
    state: Mutex<State>,
    repository_page_size: usize,
    issue_page_size: usize,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_issue: 1,
                ..State::default()
            }),
            repository_page_size: 100,
            issue_page_size: 100,
        }
    }

    pub fn with_page_sizes(mut self, repositories: usize, issues: usize) -> Self {
        self.repository_page_size = repositories;
        self.issue_page_size = issues;
        self
    }

    pub fn add_repository(&self, repository: RepositoryRef) -> &Self {
        self.state.lock().unwrap().repositories.push(repository);
        self
    }

    pub fn set_file(&self, repository: &RepositoryId, text: &str) -> &Self {
        self.state.lock().unwrap().files.insert(
            repository.clone(),
            FileContent {
                size: text.len() as u64,
                raw: text.to_string(),
                encoding: ContentEncoding::Utf8,
            },
        );
        self
    }

    pub fn fail_fetch(&self, repository: &RepositoryId, err: PlatformError) -> &Self {
        self.state
            .lock()
            .unwrap()
            .fetch_errors
            .insert(repository.clone(), err);
        self
    }

    pub fn open_issue(&self, repository: &RepositoryId, title: &str) -> IssueNumber {
        let mut state = self.state.lock().unwrap();
        let number = IssueNumber::new(state.next_issue);
        state.next_issue += 1;
        state
            .issues
            .entry(repository.clone())
            .or_default()
            .push(TrackingIssue {
                number,
                title: title.to_string(),
                state: IssueState::Open,
            });
        number
    }

    pub fn fail_create(&self, repository: &RepositoryId) -> &Self {
        self.state
            .lock()
            .unwrap()
            .failing_creates
            .insert(repository.clone());
        self
    }

    pub fn fail_close(&self, repository: &RepositoryId, issue: IssueNumber) -> &Self {
        self.state
            .lock()
            .unwrap()
            .failing_closes
            .insert((repository.clone(), issue.as_u64()));
        self
    }

    pub fn fail_comment(&self, repository: &RepositoryId, issue: IssueNumber) -> &Self {
        self.state
            .lock()
            .unwrap()
            .failing_comments
            .insert((repository.clone(), issue.as_u64()));
        self
    }

    pub fn fail_issue_listing(&self, repository: &RepositoryId) -> &Self {
        self.state
            .lock()
            .unwrap()
            .failing_issue_listings
            .insert(repository.clone());
        self
    }

    pub fn fail_repository_page(&self, page: u32) -> &Self {
        self.state.lock().unwrap().failing_repository_page = Some(page);
        self
    }

    pub fn cancel_when_fetching(&self, repository: &RepositoryId, token: CancellationToken) -> &Self {
        self.state.lock().unwrap().cancel_on_fetch = Some((repository.clone(), token));
        self
    }

    /// Makes `fetch_file` panic for `repository`, after releasing the lock.
    pub fn panic_when_fetching(&self, repository: &RepositoryId) -> &Self {
        self.state
            .lock()
            .unwrap()
            .panic_on_fetch
            .insert(repository.clone());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn calls_for(&self, repository: &RepositoryId) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.repository() == Some(repository.as_str()))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn issues(&self, repository: &RepositoryId) -> Vec<TrackingIssue> {
        self.state
            .lock()
            .unwrap()
            .issues
            .get(repository)
            .cloned()
            .unwrap_or_default()
    }

    pub fn open_tracking_issues(&self, repository: &RepositoryId) -> usize {
        self.issues(repository)
            .iter()
            .filter(|issue| issue.state == IssueState::Open && issue.title == TITLE)
            .count()
    }
}

fn paginate<T: Clone>(items: &[T], cursor: PageCursor, size: usize) -> Page<T> {
    let start = (cursor.page() as usize - 1) * size;
    let end = (start + size).min(items.len());
    let slice = if start < items.len() { items[start..end].to_vec() } else { Vec::new() };
    let next = (end < items.len()).then(|| cursor.next());
    Page { items: slice, next }
}

#[async_trait]
impl RepositoryCatalog for FakePlatform {
    async fn list_repositories(
        &self,
        _organization: &OrganizationName,
        cursor: PageCursor,
    ) -> Result<Page<RepositoryRef>, PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListRepositories { page: cursor.page() });
        if state.failing_repository_page == Some(cursor.page()) {
            return Err(PlatformError::Api {
                status: 502,
                message: "bad gateway".to_string(),
            });
        }
        Ok(paginate(&state.repositories, cursor, self.repository_page_size))
    }
}

#[async_trait]
impl ContentSource for FakePlatform {
    async fn fetch_file(
        &self,
        repository: &RepositoryId,
        path: &ArtifactPath,
    ) -> Result<FileContent, PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::FetchFile {
            repository: repository.to_string(),
            path: path.to_string(),
        });
        if let Some((target, token)) = &state.cancel_on_fetch {
            if target == repository {
                token.cancel();
            }
        }
        if state.panic_on_fetch.contains(repository) {
            drop(state);
            panic!("fetch_file exploded for {repository}");
        }
        if let Some(err) = state.fetch_errors.get(repository) {
            return Err(err.clone());
        }
        state
            .files
            .get(repository)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound {
                resource: format!("{repository}/{path}"),
            })
    }
}

#[async_trait]
impl IssueStore for FakePlatform {
    async fn list_open_issues(
        &self,
        repository: &RepositoryId,
        cursor: PageCursor,
    ) -> Result<Page<TrackingIssue>, PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListIssues {
            repository: repository.to_string(),
            page: cursor.page(),
        });
        if state.failing_issue_listings.contains(repository) {
            return Err(PlatformError::Timeout);
        }
        let open: Vec<TrackingIssue> = state
            .issues
            .get(repository)
            .map(|issues| {
                issues
                    .iter()
                    .filter(|issue| issue.state == IssueState::Open)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(paginate(&open, cursor, self.issue_page_size))
    }

    async fn create_issue(
        &self,
        repository: &RepositoryId,
        title: &str,
        body: &str,
    ) -> Result<IssueNumber, PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateIssue {
            repository: repository.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        });
        if state.failing_creates.contains(repository) {
            return Err(PlatformError::Api {
                status: 500,
                message: "internal error".to_string(),
            });
        }
        let number = IssueNumber::new(state.next_issue);
        state.next_issue += 1;
        state
            .issues
            .entry(repository.clone())
            .or_default()
            .push(TrackingIssue {
                number,
                title: title.to_string(),
                state: IssueState::Open,
            });
        Ok(number)
    }

    async fn add_comment(
        &self,
        repository: &RepositoryId,
        issue: IssueNumber,
        body: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::AddComment {
            repository: repository.to_string(),
            issue: issue.as_u64(),
            body: body.to_string(),
        });
        if state
            .failing_comments
            .contains(&(repository.clone(), issue.as_u64()))
        {
            return Err(PlatformError::Api {
                status: 500,
                message: "internal error".to_string(),
            });
        }
        Ok(())
    }

    async fn close_issue(
        &self,
        repository: &RepositoryId,
        issue: IssueNumber,
        reason: CloseReason,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CloseIssue {
            repository: repository.to_string(),
            issue: issue.as_u64(),
            reason,
        });
        if state
            .failing_closes
            .contains(&(repository.clone(), issue.as_u64()))
        {
            return Err(PlatformError::Api {
                status: 500,
                message: "internal error".to_string(),
            });
        }
        if let Some(found) = state
            .issues
            .get_mut(repository)
            .and_then(|issues| issues.iter_mut().find(|i| i.number == issue))
        {
            found.state = IssueState::Closed;
        }
        Ok(())
    }
}

/// Renders `"<template>: <repository> <filename>"`.
pub struct EchoRenderer;

impl TemplateRenderer for EchoRenderer {
    fn render(
        &self,
        template: &TemplateName,
        context: &TemplateContext,
    ) -> Result<String, TemplateError> {
        Ok(format!(
            "{template}: {} {}",
            context.repository, context.filename
        ))
    }
}

/// Fails every render.
pub struct BrokenRenderer;

impl TemplateRenderer for BrokenRenderer {
    fn render(
        &self,
        template: &TemplateName,
        _context: &TemplateContext,
    ) -> Result<String, TemplateError> {
        Err(TemplateError::NotLoaded {
            name: template.clone(),
        })
    }
}

pub fn repo(name: &str) -> RepositoryId {
    RepositoryId::from_parts("acme", name).unwrap()
}

pub fn config(dry_run: bool) -> Arc<AuditConfig> {
    Arc::new(
        AuditConfig::new(OrganizationName::new("acme").unwrap())
            .with_dry_run(dry_run)
            .with_delay(std::time::Duration::ZERO),
    )
}
