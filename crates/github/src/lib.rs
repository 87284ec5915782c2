//! GitHub infrastructure adapter.
//!
//! Implements the hosting-platform ports defined in the [`compliance`] crate
//! (`RepositoryCatalog`, `ContentSource`, `IssueStore`) over the GitHub REST
//! API using [`reqwest`].
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules.
//! All GitHub API details (authentication headers, pagination via `Link`,
//! rate limiting, retries, content encodings) are handled here; the
//! [`compliance`] and `reconciler` crates never see them.
//!
//! ## Retries
//!
//! Only GET requests are retried. Issue creation, comments and closes are
//! attempted once; the reconciler records the failure and the next audit run
//! picks the repository up again.

mod api;
mod client;
mod config;
mod payloads;

pub use client::{ClientBuildError, GitHubClient};
pub use config::{GitHubClientConfig, DEFAULT_API_URL, MAX_PAGE_SIZE};
