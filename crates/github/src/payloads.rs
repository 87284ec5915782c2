//! REST response and request bodies, and their conversion into domain types.
//!
//! Only the fields the audit reads are declared; serde ignores the rest.

use compliance::{
    ContentEncoding, FileContent, IssueNumber, IssueState, PlatformError, RepositoryId,
    RepositoryRef, TrackingIssue,
};
use serde::{Deserialize, Serialize};

fn enabled() -> bool {
    true
}

/// Element of `GET /orgs/{org}/repos`.
#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryPayload {
    pub full_name: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default = "enabled")]
    pub has_issues: bool,
}

impl RepositoryPayload {
    pub fn into_domain(self) -> Result<RepositoryRef, PlatformError> {
        let id = RepositoryId::new(self.full_name.as_str()).ok_or_else(|| {
            PlatformError::UnexpectedResponse {
                message: format!("malformed repository full_name {:?}", self.full_name),
            }
        })?;
        Ok(RepositoryRef {
            id,
            archived: self.archived,
            issues_enabled: self.has_issues,
        })
    }
}

/// Body of `GET /repos/{owner}/{repo}/contents/{path}` for a single file.
#[derive(Debug, Deserialize)]
pub(crate) struct ContentPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub size: u64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub encoding: String,
}

/// Decoded contents-endpoint response.
#[derive(Debug, PartialEq)]
pub(crate) enum ContentResponse {
    /// Content arrived inline.
    Inline(FileContent),
    /// The file is too large for inline content (GitHub sends
    /// `encoding: "none"`); it must be fetched with the raw media type.
    TooLarge { size: u64 },
}

impl ContentPayload {
    pub fn into_response(self) -> Result<ContentResponse, PlatformError> {
        if self.kind != "file" {
            return Err(PlatformError::UnexpectedResponse {
                message: format!("expected a file, found a {}", self.kind),
            });
        }
        let encoding = match self.encoding.as_str() {
            "base64" => ContentEncoding::Base64,
            "none" => return Ok(ContentResponse::TooLarge { size: self.size }),
            "" | "utf-8" => ContentEncoding::Utf8,
            other => {
                return Err(PlatformError::UnexpectedResponse {
                    message: format!("unsupported content encoding {other:?}"),
                })
            }
        };
        Ok(ContentResponse::Inline(FileContent {
            size: self.size,
            raw: self.content,
            encoding,
        }))
    }
}

/// Element of `GET /repos/{owner}/{repo}/issues`.
#[derive(Debug, Deserialize)]
pub(crate) struct IssuePayload {
    pub number: u64,
    pub title: String,
    pub state: String,
    /// Present only when the item is a pull request.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl IssuePayload {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    pub fn into_domain(self) -> TrackingIssue {
        TrackingIssue {
            number: IssueNumber::new(self.number),
            title: self.title,
            state: if self.state == "open" {
                IssueState::Open
            } else {
                IssueState::Closed
            },
        }
    }
}

/// Response of `POST /repos/{owner}/{repo}/issues`.
#[derive(Debug, Deserialize)]
pub(crate) struct CreatedIssuePayload {
    pub number: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewIssue<'a> {
    pub title: &'a str,
    pub body: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewComment<'a> {
    pub body: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct IssueUpdate<'a> {
    pub state: &'a str,
    pub state_reason: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_payload_reads_flags() {
        let payload: RepositoryPayload = serde_json::from_str(
            r#"{"id":1,"name":"tool","full_name":"acme/tool","archived":true,"has_issues":false,"private":false}"#,
        )
        .unwrap();
        let repository = payload.into_domain().unwrap();
        assert_eq!(repository.id.as_str(), "acme/tool");
        assert!(repository.archived);
        assert!(!repository.issues_enabled);
    }

    #[test]
    fn repository_flags_default_to_active_with_issues() {
        let payload: RepositoryPayload = serde_json::from_str(r#"{"full_name":"acme/tool"}"#).unwrap();
        let repository = payload.into_domain().unwrap();
        assert!(!repository.archived);
        assert!(repository.issues_enabled);
    }

    #[test]
    fn malformed_full_name_is_an_unexpected_response() {
        let payload: RepositoryPayload = serde_json::from_str(r#"{"full_name":"tool"}"#).unwrap();
        assert!(matches!(
            payload.into_domain(),
            Err(PlatformError::UnexpectedResponse { .. })
        ));
    }

    #[test]
    fn base64_file_content_is_kept_encoded() {
        let payload: ContentPayload = serde_json::from_str(
            r#"{"type":"file","size":10,"encoding":"base64","content":"cmVwb3M6\nIFtdCg==\n","sha":"abc"}"#,
        )
        .unwrap();
        assert_eq!(
            payload.into_response().unwrap(),
            ContentResponse::Inline(FileContent {
                size: 10,
                raw: "cmVwb3M6\nIFtdCg==\n".to_string(),
                encoding: ContentEncoding::Base64,
            })
        );
    }

    #[test]
    fn large_file_needs_raw_fetch() {
        let payload: ContentPayload = serde_json::from_str(
            r#"{"type":"file","size":2000000,"encoding":"none","content":""}"#,
        )
        .unwrap();
        assert_eq!(
            payload.into_response().unwrap(),
            ContentResponse::TooLarge { size: 2_000_000 }
        );
    }

    #[test]
    fn directory_or_symlink_is_rejected() {
        let payload: ContentPayload =
            serde_json::from_str(r#"{"type":"dir","size":0}"#).unwrap();
        assert!(matches!(
            payload.into_response(),
            Err(PlatformError::UnexpectedResponse { .. })
        ));
    }

    #[test]
    fn pull_requests_are_recognised_in_issue_listings() {
        let items: Vec<IssuePayload> = serde_json::from_str(
            r#"[
                {"number":1,"title":"Bug","state":"open"},
                {"number":2,"title":"Fix","state":"open","pull_request":{"url":"https://x"}}
            ]"#,
        )
        .unwrap();
        assert!(!items[0].is_pull_request());
        assert!(items[1].is_pull_request());
    }

    #[test]
    fn issue_state_maps_to_domain() {
        let open: IssuePayload =
            serde_json::from_str(r#"{"number":4,"title":"T","state":"open"}"#).unwrap();
        let closed: IssuePayload =
            serde_json::from_str(r#"{"number":5,"title":"T","state":"closed"}"#).unwrap();
        assert_eq!(open.into_domain().state, IssueState::Open);
        assert_eq!(closed.into_domain().number, IssueNumber::new(5));
    }

    #[test]
    fn close_request_body_carries_reason() {
        let body = serde_json::to_value(IssueUpdate {
            state: "closed",
            state_reason: "completed",
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"state": "closed", "state_reason": "completed"})
        );
    }
}
