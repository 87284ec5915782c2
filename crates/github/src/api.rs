//! [`compliance`] port implementations for [`GitHubClient`].

use async_trait::async_trait;
use compliance::{
    ArtifactPath, CloseReason, ContentEncoding, ContentSource, FileContent, IssueNumber,
    IssueStore, OrganizationName, Page, PageCursor, PlatformError, RepositoryCatalog,
    RepositoryId, RepositoryRef, TrackingIssue,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::client::{has_next_page, map_transport_error, GitHubClient, JSON_MEDIA_TYPE, RAW_MEDIA_TYPE};
use crate::payloads::{
    ContentPayload, ContentResponse, CreatedIssuePayload, IssuePayload, IssueUpdate, NewComment,
    NewIssue, RepositoryPayload,
};

impl GitHubClient {
    fn page_query(&self, cursor: PageCursor) -> String {
        format!("per_page={}&page={}", self.config.page_size, cursor.page())
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        url: &str,
        cursor: PageCursor,
    ) -> Result<(Vec<T>, Option<PageCursor>), PlatformError> {
        let response = self.get(url, JSON_MEDIA_TYPE).await?;
        let next = has_next_page(response.headers()).then(|| cursor.next());
        let items = response.json::<Vec<T>>().await.map_err(map_transport_error)?;
        Ok((items, next))
    }
}

#[async_trait]
impl RepositoryCatalog for GitHubClient {
    #[instrument(skip(self, cursor), fields(page = cursor.page()))]
    async fn list_repositories(
        &self,
        organization: &OrganizationName,
        cursor: PageCursor,
    ) -> Result<Page<RepositoryRef>, PlatformError> {
        let url = self.url(&format!(
            "/orgs/{}/repos?type=all&{}",
            encode_path(organization.as_str()),
            self.page_query(cursor)
        ));
        let (payloads, next) = self.get_page::<RepositoryPayload>(&url, cursor).await?;
        let items = payloads
            .into_iter()
            .map(RepositoryPayload::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = items.len(), has_next = next.is_some(), "listed repositories");
        Ok(Page { items, next })
    }
}

#[async_trait]
impl ContentSource for GitHubClient {
    #[instrument(skip(self, repository), fields(repository = %repository))]
    async fn fetch_file(
        &self,
        repository: &RepositoryId,
        path: &ArtifactPath,
    ) -> Result<FileContent, PlatformError> {
        let url = self.url(&format!(
            "/repos/{}/{}/contents/{}",
            encode_path(repository.owner()),
            encode_path(repository.name()),
            encode_path(path.as_str().trim_start_matches('/'))
        ));
        let payload = self
            .get(&url, JSON_MEDIA_TYPE)
            .await?
            .json::<ContentPayload>()
            .await
            .map_err(map_transport_error)?;

        match payload.into_response()? {
            ContentResponse::Inline(content) => Ok(content),
            ContentResponse::TooLarge { size } => {
                debug!(size, "file too large for inline content; fetching raw");
                let raw = self
                    .get(&url, RAW_MEDIA_TYPE)
                    .await?
                    .text()
                    .await
                    .map_err(map_transport_error)?;
                Ok(FileContent {
                    size,
                    raw,
                    encoding: ContentEncoding::Utf8,
                })
            }
        }
    }
}

#[async_trait]
impl IssueStore for GitHubClient {
    #[instrument(skip(self, repository, cursor), fields(repository = %repository, page = cursor.page()))]
    async fn list_open_issues(
        &self,
        repository: &RepositoryId,
        cursor: PageCursor,
    ) -> Result<Page<TrackingIssue>, PlatformError> {
        let url = self.url(&format!(
            "{}?state=open&{}",
            issues_path(repository),
            self.page_query(cursor)
        ));
        let (payloads, next) = self.get_page::<IssuePayload>(&url, cursor).await?;
        let items = payloads
            .into_iter()
            .filter(|issue| !issue.is_pull_request())
            .map(IssuePayload::into_domain)
            .collect();
        Ok(Page { items, next })
    }

    #[instrument(skip(self, repository, body), fields(repository = %repository))]
    async fn create_issue(
        &self,
        repository: &RepositoryId,
        title: &str,
        body: &str,
    ) -> Result<IssueNumber, PlatformError> {
        let url = self.url(&issues_path(repository));
        let created = self
            .send(Method::POST, &url, &NewIssue { title, body })
            .await?
            .json::<CreatedIssuePayload>()
            .await
            .map_err(map_transport_error)?;
        Ok(IssueNumber::new(created.number))
    }

    #[instrument(skip(self, repository, issue, body), fields(repository = %repository, issue = issue.as_u64()))]
    async fn add_comment(
        &self,
        repository: &RepositoryId,
        issue: IssueNumber,
        body: &str,
    ) -> Result<(), PlatformError> {
        let url = self.url(&format!(
            "{}/{}/comments",
            issues_path(repository),
            issue.as_u64()
        ));
        self.send(Method::POST, &url, &NewComment { body }).await?;
        Ok(())
    }

    #[instrument(skip(self, repository, issue), fields(repository = %repository, issue = issue.as_u64()))]
    async fn close_issue(
        &self,
        repository: &RepositoryId,
        issue: IssueNumber,
        reason: CloseReason,
    ) -> Result<(), PlatformError> {
        let url = self.url(&format!("{}/{}", issues_path(repository), issue.as_u64()));
        let update = IssueUpdate {
            state: "closed",
            state_reason: reason.as_str(),
        };
        self.send(Method::PATCH, &url, &update).await?;
        Ok(())
    }
}

fn issues_path(repository: &RepositoryId) -> String {
    format!(
        "/repos/{}/{}/issues",
        encode_path(repository.owner()),
        encode_path(repository.name())
    )
}

/// Percent-encodes everything outside the RFC 3986 unreserved set, keeping
/// `/` so nested file paths stay nested.
fn encode_path(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                encoded.push(byte as char);
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GitHubClientConfig;

    fn client() -> GitHubClient {
        GitHubClient::new(
            GitHubClientConfig::new("ghp_test")
                .with_api_base_url("https://api.example.com")
                .with_page_size(50),
        )
        .unwrap()
    }

    #[test]
    fn dotfile_paths_are_not_encoded() {
        assert_eq!(encode_path(".pre-commit-config.yaml"), ".pre-commit-config.yaml");
        assert_eq!(encode_path("ci/hooks/.pre-commit-config.yaml"), "ci/hooks/.pre-commit-config.yaml");
    }

    #[test]
    fn reserved_characters_are_percent_encoded() {
        assert_eq!(encode_path("my config.yaml"), "my%20config.yaml");
        assert_eq!(encode_path("a?b#c"), "a%3Fb%23c");
    }

    #[test]
    fn issue_urls_are_rooted_at_the_repository() {
        let repository = RepositoryId::new("acme/tool").unwrap();
        assert_eq!(issues_path(&repository), "/repos/acme/tool/issues");
        assert_eq!(
            client().url(&issues_path(&repository)),
            "https://api.example.com/repos/acme/tool/issues"
        );
    }

    #[test]
    fn page_query_uses_configured_size() {
        let cursor = PageCursor::first().next();
        assert_eq!(client().page_query(cursor), "per_page=50&page=2");
    }
}
