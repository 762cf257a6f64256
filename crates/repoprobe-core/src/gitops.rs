//! Git plumbing helper for single-file fixes.
//!
//! Wraps the three host-side mechanisms every fixable rule needs:
//! - [`commit_base`] — deterministic get-or-create of the fix branch tip;
//! - [`push_file_rewrite`] — blob → tree → commit → reference update;
//! - [`reconcile_pull_request`] — converge pull request state without
//!   duplicating, keyed by the deterministic title.

use tracing::{debug, info};

use crate::domain::error::{AuditError, Result};
use crate::domain::repository::Repository;
use crate::host::{GitCommit, HostClient, ItemState};

/// Outcome of a pull request reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullAction {
    /// An open pull request with the deterministic title already exists.
    AlreadyOpen(u64),
    /// A closed, unmerged pull request with a live, unchanged head branch
    /// was reopened.
    Reopened(u64),
    /// A new pull request was created.
    Created(u64),
}

/// Tip commit of the fix branch, creating the branch from the default
/// branch tip when it does not exist yet.
///
/// Idempotent: a second call with the same branch name returns the same
/// commit without creating anything. A creation race (the branch appearing
/// between lookup and create) resolves by re-reading the branch.
pub async fn commit_base(
    host: &dyn HostClient,
    repo: &Repository,
    branch_name: &str,
) -> Result<GitCommit> {
    match host.branch(repo, branch_name).await {
        Ok(branch) => host.commit(repo, &branch.sha).await,
        Err(e) if e.is_not_found() => {
            let default = host.branch(repo, &repo.default_branch).await?;
            debug!(
                repo = %repo.full_name(),
                branch = branch_name,
                from = %default.sha,
                "creating fix branch"
            );
            match host.create_branch(repo, branch_name, &default.sha).await {
                Ok(branch) => host.commit(repo, &branch.sha).await,
                Err(AuditError::Remote { status: 422, .. }) => {
                    // Lost a creation race; the branch now exists.
                    let branch = host.branch(repo, branch_name).await?;
                    host.commit(repo, &branch.sha).await
                }
                Err(e) => Err(e),
            }
        }
        Err(e) => Err(e),
    }
}

/// Rewrite one file on `branch` on top of `base`, returning the new tip.
pub async fn push_file_rewrite(
    host: &dyn HostClient,
    repo: &Repository,
    branch: &str,
    base: &GitCommit,
    path: &str,
    content: &str,
    message: &str,
) -> Result<GitCommit> {
    let blob_sha = host.create_blob(repo, content).await?;
    let tree_sha = host.create_tree(repo, &base.tree_sha, path, &blob_sha).await?;
    let commit = host
        .create_commit(repo, message, &tree_sha, &base.sha)
        .await?;
    host.update_ref(repo, branch, &commit.sha).await?;
    info!(
        repo = %repo.full_name(),
        branch = branch,
        path = path,
        commit = %commit.sha,
        "pushed file rewrite"
    );
    Ok(commit)
}

/// Converge pull request state for a fix branch.
///
/// Tie-break order: an existing open pull request with the deterministic
/// title wins (no-op); otherwise a closed, unmerged one whose head branch
/// still exists and still points at the commit recorded on the pull
/// request is reopened; otherwise a new pull request is created from
/// `head_branch` onto the default branch. A pull request whose head branch
/// was deleted is never reopened.
pub async fn reconcile_pull_request(
    host: &dyn HostClient,
    repo: &Repository,
    head_branch: &str,
    title: &str,
    body: &str,
) -> Result<PullAction> {
    let pulls = host.list_pulls(repo).await?;

    if let Some(open) = pulls
        .iter()
        .find(|p| p.title == title && p.state == ItemState::Open)
    {
        debug!(repo = %repo.full_name(), number = open.number, "fix pull request already open");
        return Ok(PullAction::AlreadyOpen(open.number));
    }

    for closed in pulls
        .iter()
        .filter(|p| p.title == title && p.state == ItemState::Closed && !p.merged)
    {
        match host.branch(repo, &closed.head_branch).await {
            Ok(branch) if branch.sha == closed.head_sha => {
                host.set_pull_state(repo, closed.number, ItemState::Open)
                    .await?;
                info!(repo = %repo.full_name(), number = closed.number, "reopened fix pull request");
                return Ok(PullAction::Reopened(closed.number));
            }
            // Branch moved since the pull request was closed; its recorded
            // content no longer matches.
            Ok(_) => {}
            // Head branch deleted: nothing left to merge.
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
    }

    let created = host
        .create_pull(repo, title, body, head_branch, &repo.default_branch)
        .await?;
    info!(repo = %repo.full_name(), number = created.number, "created fix pull request");
    Ok(PullAction::Created(created.number))
}
