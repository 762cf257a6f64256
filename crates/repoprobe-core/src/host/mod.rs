//! Hosting API collaborator interface.
//!
//! [`HostClient`] is the single seam between the audit core and the
//! source-hosting transport. It covers exactly the operations the core
//! consumes: repository metadata, content reads, branch/blob/tree/commit/
//! reference plumbing for single-file fixes, pull requests, issues, and
//! latest-release lookup.
//!
//! Implementations are async and backend-agnostic. An in-memory fake is
//! provided in [`fakes`] for testing; [`github`] provides the REST
//! adapter.

pub mod fakes;
pub mod github;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::Result;
use crate::domain::repository::Repository;

/// Open/closed state shared by issues and pull requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    Open,
    Closed,
}

/// A branch head: name plus tip commit SHA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub sha: String,
}

/// A commit with its root tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitCommit {
    pub sha: String,
    pub tree_sha: String,
}

/// A pull request as seen by the reconciliation logic.
///
/// `head_sha` is the head commit recorded on the pull request itself, not
/// the live branch tip; reconciliation compares the two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub state: ItemState,
    pub merged: bool,
    pub head_branch: String,
    pub head_sha: String,
    pub updated_at: DateTime<Utc>,
}

/// A tracker issue. Identity for reconciliation is the title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerIssue {
    pub number: u64,
    pub title: String,
    pub state: ItemState,
    pub body: String,
    pub updated_at: DateTime<Utc>,
}

/// Latest published release of an upstream library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestRelease {
    pub tag: String,
    pub html_url: String,
}

/// Async client for the source-hosting API.
///
/// Error contract: operations on absent remote objects return
/// `AuditError::NotFound`; transport and 5xx failures return
/// `AuditError::Remote`. Neither is retried at this layer.
#[async_trait]
pub trait HostClient: Send + Sync {
    /// Fetch the repository snapshot by owner and name.
    async fn repository(&self, owner: &str, name: &str) -> Result<Repository>;

    /// Fetch a single file's text content at a branch ref.
    async fn file_content(&self, repo: &Repository, git_ref: &str, path: &str) -> Result<String>;

    /// List entry names of a directory at a branch ref. `path` of `""`
    /// means the repository root.
    async fn list_dir(&self, repo: &Repository, git_ref: &str, path: &str) -> Result<Vec<String>>;

    /// List all branches.
    async fn list_branches(&self, repo: &Repository) -> Result<Vec<Branch>>;

    /// Get one branch by name.
    async fn branch(&self, repo: &Repository, name: &str) -> Result<Branch>;

    /// Create a branch pointing at `sha`.
    async fn create_branch(&self, repo: &Repository, name: &str, sha: &str) -> Result<Branch>;

    /// Get a commit by SHA.
    async fn commit(&self, repo: &Repository, sha: &str) -> Result<GitCommit>;

    /// Create a blob; returns the blob SHA.
    async fn create_blob(&self, repo: &Repository, content: &str) -> Result<String>;

    /// Create a tree on top of `base_tree_sha` with one path replaced;
    /// returns the tree SHA.
    async fn create_tree(
        &self,
        repo: &Repository,
        base_tree_sha: &str,
        path: &str,
        blob_sha: &str,
    ) -> Result<String>;

    /// Create a commit; returns the new commit.
    async fn create_commit(
        &self,
        repo: &Repository,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
    ) -> Result<GitCommit>;

    /// Point a branch reference at `sha`.
    async fn update_ref(&self, repo: &Repository, branch: &str, sha: &str) -> Result<()>;

    /// List pull requests in every state.
    async fn list_pulls(&self, repo: &Repository) -> Result<Vec<PullRequest>>;

    /// Open a new pull request from `head` onto `base`.
    async fn create_pull(
        &self,
        repo: &Repository,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequest>;

    /// Update a pull request's open/closed state. Body and title are left
    /// untouched.
    async fn set_pull_state(&self, repo: &Repository, number: u64, state: ItemState) -> Result<()>;

    /// List currently open issues.
    async fn open_issues(&self, repo: &Repository) -> Result<Vec<TrackerIssue>>;

    /// Open a new issue.
    async fn create_issue(&self, repo: &Repository, title: &str, body: &str)
        -> Result<TrackerIssue>;

    /// Update an issue's open/closed state. Never deletes.
    async fn set_issue_state(&self, repo: &Repository, number: u64, state: ItemState)
        -> Result<()>;

    /// Latest release of `owner/name`.
    async fn latest_release(&self, owner: &str, name: &str) -> Result<LatestRelease>;
}

/// Helper for status introspection payloads: rule name → configuration map.
pub type RuleConfiguration = BTreeMap<String, String>;
