//! In-memory fake for the hosting client (testing only).
//!
//! [`MemoryHost`] satisfies the [`HostClient`] contract without any network
//! dependency. Branch/blob/tree/commit plumbing is backed by a small
//! content-addressed graph so that a file rewritten through the fix path is
//! visible to subsequent `file_content` reads on that branch. Every trait
//! call is counted by operation name, which lets tests assert "zero issue
//! calls" style properties.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::domain::error::{AuditError, Result};
use crate::domain::repository::Repository;
use crate::host::{
    Branch, GitCommit, HostClient, ItemState, LatestRelease, PullRequest, TrackerIssue,
};

fn sha_of(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())[..40].to_string()
}

#[derive(Default)]
struct HostState {
    repos: HashMap<String, Repository>,
    /// Seeded file content keyed by (repo, ref, path). Reads fall back here
    /// when the branch's commit graph has no entry for the path.
    files: HashMap<(String, String, String), String>,
    branches: HashMap<String, Vec<Branch>>,
    commits: HashMap<String, GitCommit>,
    blobs: HashMap<String, String>,
    trees: HashMap<String, BTreeMap<String, String>>,
    pulls: HashMap<String, Vec<PullRequest>>,
    issues: HashMap<String, Vec<TrackerIssue>>,
    releases: HashMap<String, LatestRelease>,
    calls: BTreeMap<String, u64>,
    next_number: u64,
}

impl HostState {
    fn count(&mut self, op: &str) {
        *self.calls.entry(op.to_string()).or_insert(0) += 1;
    }

    fn branch_of(&self, full: &str, name: &str) -> Option<Branch> {
        self.branches
            .get(full)
            .and_then(|b| b.iter().find(|b| b.name == name))
            .cloned()
    }

    /// Resolve a path at a ref through the commit graph, if present.
    fn graph_content(&self, full: &str, git_ref: &str, path: &str) -> Option<String> {
        let branch = self.branch_of(full, git_ref)?;
        let commit = self.commits.get(&branch.sha)?;
        let tree = self.trees.get(&commit.tree_sha)?;
        let blob_sha = tree.get(path)?;
        self.blobs.get(blob_sha).cloned()
    }

    /// All paths visible at a ref (seeded plus graph-backed).
    fn paths_at(&self, full: &str, git_ref: &str) -> Vec<String> {
        let mut paths: Vec<String> = self
            .files
            .keys()
            .filter(|(f, r, _)| f == full && r == git_ref)
            .map(|(_, _, p)| p.clone())
            .collect();
        if let Some(branch) = self.branch_of(full, git_ref) {
            if let Some(commit) = self.commits.get(&branch.sha) {
                if let Some(tree) = self.trees.get(&commit.tree_sha) {
                    paths.extend(tree.keys().cloned());
                }
            }
        }
        paths.sort();
        paths.dedup();
        paths
    }
}

/// In-memory hosting client for tests.
#[derive(Default)]
pub struct MemoryHost {
    state: Mutex<HostState>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository and give its default branch an empty root
    /// commit so branch lookups succeed.
    pub fn add_repository(&self, repo: &Repository) {
        let mut state = self.state.lock().unwrap();
        let full = repo.full_name();
        let tree_sha = sha_of(&[&full, "root-tree"]);
        let commit_sha = sha_of(&[&full, "root-commit"]);
        state.trees.entry(tree_sha.clone()).or_default();
        state.commits.insert(
            commit_sha.clone(),
            GitCommit {
                sha: commit_sha.clone(),
                tree_sha,
            },
        );
        state.branches.entry(full.clone()).or_default().push(Branch {
            name: repo.default_branch.clone(),
            sha: commit_sha,
        });
        state.repos.insert(full, repo.clone());
    }

    /// Register a repository without any content at its default branch
    /// (newly created repository edge case).
    pub fn add_empty_repository(&self, repo: &Repository) {
        let mut state = self.state.lock().unwrap();
        state.repos.insert(repo.full_name(), repo.clone());
    }

    /// Seed a file at (ref, path).
    ///
    /// When the ref is a known branch the file is committed into the
    /// branch's graph, so branches later created from that tip inherit it.
    /// Otherwise the content lands in the flat per-ref map.
    pub fn seed_file(&self, repo: &Repository, git_ref: &str, path: &str, content: &str) {
        let mut state = self.state.lock().unwrap();
        let full = repo.full_name();
        let base = state
            .branch_of(&full, git_ref)
            .and_then(|b| state.commits.get(&b.sha).cloned());
        if let Some(base) = base {
            let blob_sha = sha_of(&["blob", content]);
            state.blobs.insert(blob_sha.clone(), content.to_string());
            let mut entries = state
                .trees
                .get(&base.tree_sha)
                .cloned()
                .unwrap_or_default();
            entries.insert(path.to_string(), blob_sha);
            let joined: Vec<String> = entries.iter().map(|(p, s)| format!("{p}={s}")).collect();
            let tree_sha = sha_of(&["tree", &joined.join(",")]);
            state.trees.insert(tree_sha.clone(), entries);
            let commit_sha = sha_of(&["commit", "seed", &tree_sha, &base.sha]);
            state.commits.insert(
                commit_sha.clone(),
                GitCommit {
                    sha: commit_sha.clone(),
                    tree_sha,
                },
            );
            if let Some(branches) = state.branches.get_mut(&full) {
                if let Some(b) = branches.iter_mut().find(|b| b.name == git_ref) {
                    b.sha = commit_sha;
                }
            }
            return;
        }
        state.files.insert(
            (full, git_ref.to_string(), path.to_string()),
            content.to_string(),
        );
    }

    /// Seed an extra branch pointing at a synthetic commit.
    pub fn seed_branch(&self, repo: &Repository, name: &str) {
        let mut state = self.state.lock().unwrap();
        let full = repo.full_name();
        let sha = sha_of(&[&full, "branch", name]);
        let tree_sha = sha_of(&[&full, "branch-tree", name]);
        state.trees.entry(tree_sha.clone()).or_default();
        state
            .commits
            .insert(sha.clone(), GitCommit { sha: sha.clone(), tree_sha });
        state
            .branches
            .entry(full)
            .or_default()
            .push(Branch {
                name: name.to_string(),
                sha,
            });
    }

    /// Seed the latest release for `owner/name`.
    pub fn seed_release(&self, owner: &str, name: &str, tag: &str) {
        let mut state = self.state.lock().unwrap();
        state.releases.insert(
            format!("{owner}/{name}"),
            LatestRelease {
                tag: tag.to_string(),
                html_url: format!("https://example.invalid/{owner}/{name}/releases/{tag}"),
            },
        );
    }

    /// Seed a pull request verbatim (for reconciliation edge tests).
    pub fn seed_pull(&self, repo: &Repository, pull: PullRequest) {
        let mut state = self.state.lock().unwrap();
        state.next_number = state.next_number.max(pull.number);
        state.pulls.entry(repo.full_name()).or_default().push(pull);
    }

    /// Seed an open issue with the given title.
    pub fn seed_issue(&self, repo: &Repository, title: &str, body: &str) -> u64 {
        let mut state = self.state.lock().unwrap();
        state.next_number += 1;
        let number = state.next_number;
        state
            .issues
            .entry(repo.full_name())
            .or_default()
            .push(TrackerIssue {
                number,
                title: title.to_string(),
                state: ItemState::Open,
                body: body.to_string(),
                updated_at: Utc::now(),
            });
        number
    }

    /// How many times the named trait operation was called.
    pub fn calls(&self, op: &str) -> u64 {
        let state = self.state.lock().unwrap();
        state.calls.get(op).copied().unwrap_or(0)
    }

    /// Total calls across all issue operations.
    pub fn issue_calls(&self) -> u64 {
        self.calls("open_issues") + self.calls("create_issue") + self.calls("set_issue_state")
    }

    /// Current pull requests of a repository.
    pub fn pulls_snapshot(&self, repo: &Repository) -> Vec<PullRequest> {
        let state = self.state.lock().unwrap();
        state.pulls.get(&repo.full_name()).cloned().unwrap_or_default()
    }

    /// Current issues of a repository (all states).
    pub fn issues_snapshot(&self, repo: &Repository) -> Vec<TrackerIssue> {
        let state = self.state.lock().unwrap();
        state.issues.get(&repo.full_name()).cloned().unwrap_or_default()
    }

    /// Current branches of a repository.
    pub fn branches_snapshot(&self, repo: &Repository) -> Vec<Branch> {
        let state = self.state.lock().unwrap();
        state.branches.get(&repo.full_name()).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl HostClient for MemoryHost {
    async fn repository(&self, owner: &str, name: &str) -> Result<Repository> {
        let mut state = self.state.lock().unwrap();
        state.count("repository");
        state
            .repos
            .get(&format!("{owner}/{name}"))
            .cloned()
            .ok_or_else(|| AuditError::not_found(format!("repository {owner}/{name}")))
    }

    async fn file_content(&self, repo: &Repository, git_ref: &str, path: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.count("file_content");
        let full = repo.full_name();
        if let Some(content) = state.graph_content(&full, git_ref, path) {
            return Ok(content);
        }
        state
            .files
            .get(&(full.clone(), git_ref.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| AuditError::not_found(format!("{full}:{git_ref}:{path}")))
    }

    async fn list_dir(&self, repo: &Repository, git_ref: &str, path: &str) -> Result<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        state.count("list_dir");
        let full = repo.full_name();
        let paths = state.paths_at(&full, git_ref);
        if paths.is_empty() {
            return Err(AuditError::not_found(format!("{full}:{git_ref} contents")));
        }
        let names: Vec<String> = paths
            .iter()
            .filter_map(|p| {
                if path.is_empty() {
                    // Root listing: direct children only.
                    Some(p.split('/').next().unwrap_or(p).to_string())
                } else {
                    let prefix = format!("{path}/");
                    p.strip_prefix(&prefix)
                        .filter(|rest| !rest.contains('/'))
                        .map(str::to_string)
                }
            })
            .collect();
        let mut names = names;
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn list_branches(&self, repo: &Repository) -> Result<Vec<Branch>> {
        let mut state = self.state.lock().unwrap();
        state.count("list_branches");
        Ok(state
            .branches
            .get(&repo.full_name())
            .cloned()
            .unwrap_or_default())
    }

    async fn branch(&self, repo: &Repository, name: &str) -> Result<Branch> {
        let mut state = self.state.lock().unwrap();
        state.count("branch");
        state
            .branch_of(&repo.full_name(), name)
            .ok_or_else(|| AuditError::not_found(format!("branch {name}")))
    }

    async fn create_branch(&self, repo: &Repository, name: &str, sha: &str) -> Result<Branch> {
        let mut state = self.state.lock().unwrap();
        state.count("create_branch");
        let full = repo.full_name();
        if state.branch_of(&full, name).is_some() {
            return Err(AuditError::Remote {
                status: 422,
                message: format!("reference refs/heads/{name} already exists"),
            });
        }
        let branch = Branch {
            name: name.to_string(),
            sha: sha.to_string(),
        };
        state.branches.entry(full).or_default().push(branch.clone());
        Ok(branch)
    }

    async fn commit(&self, _repo: &Repository, sha: &str) -> Result<GitCommit> {
        let mut state = self.state.lock().unwrap();
        state.count("commit");
        state
            .commits
            .get(sha)
            .cloned()
            .ok_or_else(|| AuditError::not_found(format!("commit {sha}")))
    }

    async fn create_blob(&self, _repo: &Repository, content: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.count("create_blob");
        let sha = sha_of(&["blob", content]);
        state.blobs.insert(sha.clone(), content.to_string());
        Ok(sha)
    }

    async fn create_tree(
        &self,
        _repo: &Repository,
        base_tree_sha: &str,
        path: &str,
        blob_sha: &str,
    ) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.count("create_tree");
        let mut entries = state
            .trees
            .get(base_tree_sha)
            .cloned()
            .ok_or_else(|| AuditError::not_found(format!("tree {base_tree_sha}")))?;
        entries.insert(path.to_string(), blob_sha.to_string());
        let joined: Vec<String> = entries.iter().map(|(p, s)| format!("{p}={s}")).collect();
        let sha = sha_of(&["tree", &joined.join(",")]);
        state.trees.insert(sha.clone(), entries);
        Ok(sha)
    }

    async fn create_commit(
        &self,
        _repo: &Repository,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
    ) -> Result<GitCommit> {
        let mut state = self.state.lock().unwrap();
        state.count("create_commit");
        let sha = sha_of(&["commit", message, tree_sha, parent_sha]);
        let commit = GitCommit {
            sha: sha.clone(),
            tree_sha: tree_sha.to_string(),
        };
        state.commits.insert(sha, commit.clone());
        Ok(commit)
    }

    async fn update_ref(&self, repo: &Repository, branch: &str, sha: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.count("update_ref");
        let full = repo.full_name();
        let branches = state
            .branches
            .get_mut(&full)
            .ok_or_else(|| AuditError::not_found(format!("branches of {full}")))?;
        let entry = branches
            .iter_mut()
            .find(|b| b.name == branch)
            .ok_or_else(|| AuditError::not_found(format!("branch {branch}")))?;
        entry.sha = sha.to_string();
        Ok(())
    }

    async fn list_pulls(&self, repo: &Repository) -> Result<Vec<PullRequest>> {
        let mut state = self.state.lock().unwrap();
        state.count("list_pulls");
        Ok(state
            .pulls
            .get(&repo.full_name())
            .cloned()
            .unwrap_or_default())
    }

    async fn create_pull(
        &self,
        repo: &Repository,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequest> {
        let mut state = self.state.lock().unwrap();
        state.count("create_pull");
        let full = repo.full_name();
        let _ = base;
        let head_sha = state
            .branch_of(&full, head)
            .map(|b| b.sha)
            .ok_or_else(|| AuditError::not_found(format!("branch {head}")))?;
        state.next_number += 1;
        let pull = PullRequest {
            number: state.next_number,
            title: title.to_string(),
            state: ItemState::Open,
            merged: false,
            head_branch: head.to_string(),
            head_sha,
            updated_at: Utc::now(),
        };
        let _ = body;
        state.pulls.entry(full).or_default().push(pull.clone());
        Ok(pull)
    }

    async fn set_pull_state(&self, repo: &Repository, number: u64, state_: ItemState) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.count("set_pull_state");
        let full = repo.full_name();
        let pull = state
            .pulls
            .get_mut(&full)
            .and_then(|p| p.iter_mut().find(|p| p.number == number))
            .ok_or_else(|| AuditError::not_found(format!("pull #{number}")))?;
        pull.state = state_;
        pull.updated_at = Utc::now();
        Ok(())
    }

    async fn open_issues(&self, repo: &Repository) -> Result<Vec<TrackerIssue>> {
        let mut state = self.state.lock().unwrap();
        state.count("open_issues");
        Ok(state
            .issues
            .get(&repo.full_name())
            .map(|issues| {
                issues
                    .iter()
                    .filter(|i| i.state == ItemState::Open)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create_issue(
        &self,
        repo: &Repository,
        title: &str,
        body: &str,
    ) -> Result<TrackerIssue> {
        let mut state = self.state.lock().unwrap();
        state.count("create_issue");
        state.next_number += 1;
        let issue = TrackerIssue {
            number: state.next_number,
            title: title.to_string(),
            state: ItemState::Open,
            body: body.to_string(),
            updated_at: Utc::now(),
        };
        state
            .issues
            .entry(repo.full_name())
            .or_default()
            .push(issue.clone());
        Ok(issue)
    }

    async fn set_issue_state(
        &self,
        repo: &Repository,
        number: u64,
        state_: ItemState,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.count("set_issue_state");
        let full = repo.full_name();
        let issue = state
            .issues
            .get_mut(&full)
            .and_then(|i| i.iter_mut().find(|i| i.number == number))
            .ok_or_else(|| AuditError::not_found(format!("issue #{number}")))?;
        issue.state = state_;
        issue.updated_at = Utc::now();
        Ok(())
    }

    async fn latest_release(&self, owner: &str, name: &str) -> Result<LatestRelease> {
        let mut state = self.state.lock().unwrap();
        state.count("latest_release");
        state
            .releases
            .get(&format!("{owner}/{name}"))
            .cloned()
            .ok_or_else(|| AuditError::not_found(format!("latest release of {owner}/{name}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> Repository {
        Repository {
            owner: "acme".to_string(),
            name: "repo1".to_string(),
            default_branch: "main".to_string(),
            html_url: "https://example.invalid/acme/repo1".to_string(),
            private: false,
            has_license: true,
            has_issues: true,
            description: Some("demo".to_string()),
        }
    }

    #[tokio::test]
    async fn test_seeded_file_readable() {
        let host = MemoryHost::new();
        let r = repo();
        host.add_repository(&r);
        host.seed_file(&r, "main", "README.md", "# hi");
        let content = host.file_content(&r, "main", "README.md").await.unwrap();
        assert_eq!(content, "# hi");
        assert_eq!(host.calls("file_content"), 1);
    }

    #[tokio::test]
    async fn test_empty_repository_listing_is_not_found() {
        let host = MemoryHost::new();
        let r = repo();
        host.add_empty_repository(&r);
        let err = host.list_dir(&r, "main", "").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_rewrite_visible_through_commit_graph() {
        let host = MemoryHost::new();
        let r = repo();
        host.add_repository(&r);
        let tip = host.branch(&r, "main").await.unwrap();
        let base = host.commit(&r, &tip.sha).await.unwrap();

        let blob = host.create_blob(&r, "new content").await.unwrap();
        let tree = host
            .create_tree(&r, &base.tree_sha, "Jenkinsfile", &blob)
            .await
            .unwrap();
        let commit = host
            .create_commit(&r, "update", &tree, &base.sha)
            .await
            .unwrap();
        host.create_branch(&r, "feature/x", &base.sha).await.unwrap();
        host.update_ref(&r, "feature/x", &commit.sha).await.unwrap();

        let content = host
            .file_content(&r, "feature/x", "Jenkinsfile")
            .await
            .unwrap();
        assert_eq!(content, "new content");
    }

    #[tokio::test]
    async fn test_issue_call_counters() {
        let host = MemoryHost::new();
        let r = repo();
        host.add_repository(&r);
        assert_eq!(host.issue_calls(), 0);
        host.create_issue(&r, "t", "b").await.unwrap();
        host.open_issues(&r).await.unwrap();
        assert_eq!(host.issue_calls(), 2);
    }
}
