//! GitHub REST adapter for the hosting client.
//!
//! Thin translation layer: one HTTP call per trait operation, 404 mapped to
//! `AuditError::NotFound`, any other non-success status to
//! `AuditError::Remote`. No retries here; that policy belongs to callers or
//! an outer transport layer.
//!
//! File content is fetched with the raw media type to avoid a base64
//! round-trip.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use async_trait::async_trait;

use crate::domain::error::{AuditError, Result};
use crate::domain::repository::Repository;
use crate::host::{
    Branch, GitCommit, HostClient, ItemState, LatestRelease, PullRequest, TrackerIssue,
};

const DEFAULT_API_BASE: &str = "https://api.github.com";

/// The REST API caps list responses at 100 items per page.
const PER_PAGE: usize = 100;

/// GitHub REST v3 implementation of [`HostClient`].
pub struct GithubHost {
    client: reqwest::Client,
    api_base: String,
}

impl GithubHost {
    /// Build a client authenticated with a personal access / app token.
    pub fn new(token: &str) -> Result<Self> {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    /// Build a client against a non-default API base (tests, GHE).
    pub fn with_api_base(token: &str, api_base: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("repoprobe"));
        let auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| AuditError::Orchestration("invalid token header".to_string()))?;
        headers.insert(AUTHORIZATION, auth);
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(GithubHost {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn check(&self, response: Response, what: &str) -> Result<Response> {
        match response.status() {
            StatusCode::NOT_FOUND => Err(AuditError::not_found(what.to_string())),
            status if !status.is_success() => {
                let message = response.text().await.unwrap_or_default();
                Err(AuditError::Remote {
                    status: status.as_u16(),
                    message,
                })
            }
            _ => Ok(response),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str, what: &str) -> Result<T> {
        let response = self.client.get(self.url(path)).send().await?;
        let response = self.check(response, what).await?;
        Ok(response.json().await?)
    }

    fn paged(path: &str, page: usize) -> String {
        let sep = if path.contains('?') { '&' } else { '?' };
        format!("{path}{sep}per_page={PER_PAGE}&page={page}")
    }

    /// Fetch every page of a list endpoint. Reconciliation keys on titles,
    /// so a truncated listing would create duplicates; a short page marks
    /// the end of the collection.
    async fn get_all_pages<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        what: &str,
    ) -> Result<Vec<T>> {
        let mut all = Vec::new();
        for page in 1.. {
            let batch: Vec<T> = self.get_json(&Self::paged(path, page), what).await?;
            let last = batch.len() < PER_PAGE;
            all.extend(batch);
            if last {
                break;
            }
        }
        Ok(all)
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T> {
        let response = request.send().await?;
        let response = self.check(response, what).await?;
        Ok(response.json().await?)
    }
}

#[derive(Deserialize)]
struct RepoDto {
    name: String,
    owner: OwnerDto,
    default_branch: String,
    html_url: String,
    private: bool,
    license: Option<serde_json::Value>,
    has_issues: bool,
    description: Option<String>,
}

#[derive(Deserialize)]
struct OwnerDto {
    login: String,
}

#[derive(Deserialize)]
struct BranchDto {
    name: String,
    commit: ShaDto,
}

#[derive(Deserialize)]
struct ShaDto {
    sha: String,
}

#[derive(Deserialize)]
struct CommitDto {
    sha: String,
    tree: ShaDto,
}

#[derive(Deserialize)]
struct EntryDto {
    name: String,
}

#[derive(Deserialize)]
struct PullDto {
    number: u64,
    title: String,
    state: String,
    merged_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    head: HeadDto,
}

#[derive(Deserialize)]
struct HeadDto {
    #[serde(rename = "ref")]
    branch: String,
    sha: String,
}

#[derive(Deserialize)]
struct IssueDto {
    number: u64,
    title: String,
    state: String,
    body: Option<String>,
    updated_at: DateTime<Utc>,
    pull_request: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ReleaseDto {
    tag_name: String,
    html_url: String,
}

fn item_state(raw: &str) -> ItemState {
    if raw == "open" {
        ItemState::Open
    } else {
        ItemState::Closed
    }
}

fn state_str(state: ItemState) -> &'static str {
    match state {
        ItemState::Open => "open",
        ItemState::Closed => "closed",
    }
}

impl From<PullDto> for PullRequest {
    fn from(dto: PullDto) -> Self {
        PullRequest {
            number: dto.number,
            title: dto.title,
            state: item_state(&dto.state),
            merged: dto.merged_at.is_some(),
            head_branch: dto.head.branch,
            head_sha: dto.head.sha,
            updated_at: dto.updated_at,
        }
    }
}

#[async_trait]
impl HostClient for GithubHost {
    async fn repository(&self, owner: &str, name: &str) -> Result<Repository> {
        let dto: RepoDto = self
            .get_json(
                &format!("/repos/{owner}/{name}"),
                &format!("repository {owner}/{name}"),
            )
            .await?;
        Ok(Repository {
            owner: dto.owner.login,
            name: dto.name,
            default_branch: dto.default_branch,
            html_url: dto.html_url,
            private: dto.private,
            has_license: dto.license.is_some(),
            has_issues: dto.has_issues,
            description: dto.description,
        })
    }

    async fn file_content(&self, repo: &Repository, git_ref: &str, path: &str) -> Result<String> {
        let url = self.url(&format!(
            "/repos/{}/{}/contents/{path}?ref={git_ref}",
            repo.owner, repo.name
        ));
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.github.raw+json")
            .send()
            .await?;
        let response = self
            .check(response, &format!("{}:{git_ref}:{path}", repo.full_name()))
            .await?;
        Ok(response.text().await?)
    }

    async fn list_dir(&self, repo: &Repository, git_ref: &str, path: &str) -> Result<Vec<String>> {
        let entries: Vec<EntryDto> = self
            .get_json(
                &format!(
                    "/repos/{}/{}/contents/{path}?ref={git_ref}",
                    repo.owner, repo.name
                ),
                &format!("{}:{git_ref}:{path} listing", repo.full_name()),
            )
            .await?;
        Ok(entries.into_iter().map(|e| e.name).collect())
    }

    async fn list_branches(&self, repo: &Repository) -> Result<Vec<Branch>> {
        let dtos: Vec<BranchDto> = self
            .get_all_pages(
                &format!("/repos/{}/{}/branches", repo.owner, repo.name),
                &format!("branches of {}", repo.full_name()),
            )
            .await?;
        Ok(dtos
            .into_iter()
            .map(|b| Branch {
                name: b.name,
                sha: b.commit.sha,
            })
            .collect())
    }

    async fn branch(&self, repo: &Repository, name: &str) -> Result<Branch> {
        let dto: BranchDto = self
            .get_json(
                &format!("/repos/{}/{}/branches/{name}", repo.owner, repo.name),
                &format!("branch {name}"),
            )
            .await?;
        Ok(Branch {
            name: dto.name,
            sha: dto.commit.sha,
        })
    }

    async fn create_branch(&self, repo: &Repository, name: &str, sha: &str) -> Result<Branch> {
        let request = self
            .client
            .post(self.url(&format!("/repos/{}/{}/git/refs", repo.owner, repo.name)))
            .json(&json!({ "ref": format!("refs/heads/{name}"), "sha": sha }));
        let _: serde_json::Value = self.send_json(request, &format!("create ref {name}")).await?;
        Ok(Branch {
            name: name.to_string(),
            sha: sha.to_string(),
        })
    }

    async fn commit(&self, repo: &Repository, sha: &str) -> Result<GitCommit> {
        let dto: CommitDto = self
            .get_json(
                &format!("/repos/{}/{}/git/commits/{sha}", repo.owner, repo.name),
                &format!("commit {sha}"),
            )
            .await?;
        Ok(GitCommit {
            sha: dto.sha,
            tree_sha: dto.tree.sha,
        })
    }

    async fn create_blob(&self, repo: &Repository, content: &str) -> Result<String> {
        let request = self
            .client
            .post(self.url(&format!("/repos/{}/{}/git/blobs", repo.owner, repo.name)))
            .json(&json!({ "content": content, "encoding": "utf-8" }));
        let dto: ShaDto = self.send_json(request, "create blob").await?;
        Ok(dto.sha)
    }

    async fn create_tree(
        &self,
        repo: &Repository,
        base_tree_sha: &str,
        path: &str,
        blob_sha: &str,
    ) -> Result<String> {
        let request = self
            .client
            .post(self.url(&format!("/repos/{}/{}/git/trees", repo.owner, repo.name)))
            .json(&json!({
                "base_tree": base_tree_sha,
                "tree": [{ "path": path, "mode": "100644", "type": "blob", "sha": blob_sha }],
            }));
        let dto: ShaDto = self.send_json(request, "create tree").await?;
        Ok(dto.sha)
    }

    async fn create_commit(
        &self,
        repo: &Repository,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
    ) -> Result<GitCommit> {
        let request = self
            .client
            .post(self.url(&format!("/repos/{}/{}/git/commits", repo.owner, repo.name)))
            .json(&json!({
                "message": message,
                "tree": tree_sha,
                "parents": [parent_sha],
            }));
        let dto: CommitDto = self.send_json(request, "create commit").await?;
        Ok(GitCommit {
            sha: dto.sha,
            tree_sha: dto.tree.sha,
        })
    }

    async fn update_ref(&self, repo: &Repository, branch: &str, sha: &str) -> Result<()> {
        let request = self
            .client
            .patch(self.url(&format!(
                "/repos/{}/{}/git/refs/heads/{branch}",
                repo.owner, repo.name
            )))
            .json(&json!({ "sha": sha }));
        let _: serde_json::Value = self
            .send_json(request, &format!("ref refs/heads/{branch}"))
            .await?;
        Ok(())
    }

    async fn list_pulls(&self, repo: &Repository) -> Result<Vec<PullRequest>> {
        let dtos: Vec<PullDto> = self
            .get_all_pages(
                &format!("/repos/{}/{}/pulls?state=all", repo.owner, repo.name),
                &format!("pulls of {}", repo.full_name()),
            )
            .await?;
        Ok(dtos.into_iter().map(PullRequest::from).collect())
    }

    async fn create_pull(
        &self,
        repo: &Repository,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequest> {
        let request = self
            .client
            .post(self.url(&format!("/repos/{}/{}/pulls", repo.owner, repo.name)))
            .json(&json!({ "title": title, "body": body, "head": head, "base": base }));
        let dto: PullDto = self.send_json(request, "create pull").await?;
        Ok(dto.into())
    }

    async fn set_pull_state(&self, repo: &Repository, number: u64, state: ItemState) -> Result<()> {
        let request = self
            .client
            .patch(self.url(&format!(
                "/repos/{}/{}/pulls/{number}",
                repo.owner, repo.name
            )))
            .json(&json!({ "state": state_str(state) }));
        let _: serde_json::Value = self.send_json(request, &format!("pull #{number}")).await?;
        Ok(())
    }

    async fn open_issues(&self, repo: &Repository) -> Result<Vec<TrackerIssue>> {
        let dtos: Vec<IssueDto> = self
            .get_all_pages(
                &format!("/repos/{}/{}/issues?state=open", repo.owner, repo.name),
                &format!("issues of {}", repo.full_name()),
            )
            .await?;
        // The issues endpoint also returns pull requests; drop those.
        Ok(dtos
            .into_iter()
            .filter(|d| d.pull_request.is_none())
            .map(|d| TrackerIssue {
                number: d.number,
                title: d.title,
                state: item_state(&d.state),
                body: d.body.unwrap_or_default(),
                updated_at: d.updated_at,
            })
            .collect())
    }

    async fn create_issue(
        &self,
        repo: &Repository,
        title: &str,
        body: &str,
    ) -> Result<TrackerIssue> {
        let request = self
            .client
            .post(self.url(&format!("/repos/{}/{}/issues", repo.owner, repo.name)))
            .json(&json!({ "title": title, "body": body }));
        let dto: IssueDto = self.send_json(request, "create issue").await?;
        Ok(TrackerIssue {
            number: dto.number,
            title: dto.title,
            state: item_state(&dto.state),
            body: dto.body.unwrap_or_default(),
            updated_at: dto.updated_at,
        })
    }

    async fn set_issue_state(
        &self,
        repo: &Repository,
        number: u64,
        state: ItemState,
    ) -> Result<()> {
        let request = self
            .client
            .patch(self.url(&format!(
                "/repos/{}/{}/issues/{number}",
                repo.owner, repo.name
            )))
            .json(&json!({ "state": state_str(state) }));
        let _: serde_json::Value = self.send_json(request, &format!("issue #{number}")).await?;
        Ok(())
    }

    async fn latest_release(&self, owner: &str, name: &str) -> Result<LatestRelease> {
        let dto: ReleaseDto = self
            .get_json(
                &format!("/repos/{owner}/{name}/releases/latest"),
                &format!("latest release of {owner}/{name}"),
            )
            .await?;
        Ok(LatestRelease {
            tag: dto.tag_name,
            html_url: dto.html_url,
        })
    }
}
