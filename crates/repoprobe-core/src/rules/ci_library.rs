//! Pinned CI-library version check and its automated fix.
//!
//! The pipeline file (`Jenkinsfile` by default) may pin a shared library
//! with a single-line directive such as `library 'pipeline-library@0.3.2'`.
//! The rule compares the pinned version against the library's latest
//! release tag, fetched once at [`Rule::init`]. The fix rewrites the
//! directive on a deterministic fix branch and reconciles a pull request.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;

use crate::config::AuditConfig;
use crate::domain::error::{AuditError, Result};
use crate::domain::report::RuleResult;
use crate::domain::repository::Repository;
use crate::gitops;
use crate::host::{HostClient, LatestRelease, RuleConfiguration};
use crate::rules::{Rule, RuleFix};

/// Parses and rewrites the versioned library directive.
#[derive(Clone)]
struct LibraryDirective {
    pattern: Regex,
}

impl LibraryDirective {
    fn new(library_name: &str) -> Self {
        let pattern = Regex::new(&format!(
            r"library\s+'{}@([^']+)'",
            regex::escape(library_name)
        ))
        .expect("directive pattern is valid");
        LibraryDirective { pattern }
    }

    /// Version pinned by the file, if any.
    ///
    /// Lines beginning with the line-comment marker are skipped. The
    /// canonical capture is the last capturing group of the first
    /// non-comment match.
    fn version_of(&self, content: &str) -> Option<String> {
        for line in content.lines() {
            if line.trim_start().starts_with("//") {
                continue;
            }
            if let Some(caps) = self.pattern.captures(line) {
                return caps
                    .iter()
                    .skip(1)
                    .flatten()
                    .last()
                    .map(|m| m.as_str().to_string());
            }
        }
        None
    }

    /// Rewrite the matched directive's version in place. Returns `None`
    /// when no non-comment directive exists.
    fn rewrite(&self, content: &str, new_version: &str) -> Option<String> {
        let mut lines: Vec<String> = Vec::with_capacity(content.lines().count());
        let mut rewritten = false;
        for line in content.lines() {
            if !rewritten && !line.trim_start().starts_with("//") {
                if let Some(caps) = self.pattern.captures(line) {
                    if let Some(m) = caps.iter().skip(1).flatten().last() {
                        let mut new_line = line.to_string();
                        new_line.replace_range(m.range(), new_version);
                        lines.push(new_line);
                        rewritten = true;
                        continue;
                    }
                }
            }
            lines.push(line.to_string());
        }
        if rewritten {
            let mut out = lines.join("\n");
            if content.ends_with('\n') {
                out.push('\n');
            }
            Some(out)
        } else {
            None
        }
    }
}

/// Valid when the pipeline file's library directive pins the latest
/// released version, or pins nothing at all (no directive, no file, or an
/// empty repository: there is nothing to fix).
pub struct UpToDateCiLibraryRule {
    pipeline_file: String,
    library_owner: String,
    library_name: String,
    fix_branch: String,
    pull_title: String,
    directive: LibraryDirective,
    latest: OnceLock<LatestRelease>,
}

impl UpToDateCiLibraryRule {
    pub fn new(cfg: &AuditConfig) -> Self {
        UpToDateCiLibraryRule {
            pipeline_file: cfg.pipeline_file.clone(),
            library_owner: cfg.library_owner.clone(),
            library_name: cfg.library_name.clone(),
            fix_branch: cfg.library_fix_branch(),
            pull_title: cfg.pull_title("UpToDateCiLibraryRule"),
            directive: LibraryDirective::new(&cfg.library_name),
            latest: OnceLock::new(),
        }
    }

    fn latest(&self) -> Result<&LatestRelease> {
        self.latest.get().ok_or_else(|| AuditError::Rule {
            rule: "UpToDateCiLibraryRule".to_string(),
            message: "init was not called before check".to_string(),
        })
    }

    /// Whether the pipeline at `git_ref` satisfies the rule.
    async fn valid_at(
        &self,
        host: &dyn HostClient,
        repo: &Repository,
        git_ref: &str,
        latest_tag: &str,
    ) -> Result<bool> {
        let content = match host.file_content(repo, git_ref, &self.pipeline_file).await {
            Ok(content) => content,
            Err(e) if e.is_not_found() => return Ok(true),
            Err(e) => return Err(e),
        };
        Ok(match self.directive.version_of(&content) {
            Some(version) => version == latest_tag,
            None => true,
        })
    }
}

#[async_trait]
impl Rule for UpToDateCiLibraryRule {
    fn name(&self) -> &'static str {
        "UpToDateCiLibraryRule"
    }

    async fn init(&self, host: &dyn HostClient) -> Result<()> {
        if self.latest.get().is_some() {
            return Ok(());
        }
        let release = host
            .latest_release(&self.library_owner, &self.library_name)
            .await?;
        let _ = self.latest.set(release);
        Ok(())
    }

    async fn check(&self, host: &dyn HostClient, repo: &Repository) -> Result<RuleResult> {
        let latest = self.latest()?.clone();
        let is_valid = self
            .valid_at(host, repo, &repo.default_branch, &latest.tag)
            .await?;
        let how_to_fix = format!(
            "Pin {} to its latest release {} in {} ({}).",
            self.library_name, latest.tag, self.pipeline_file, latest.html_url
        );
        let fix = Arc::new(CiLibraryFix {
            pipeline_file: self.pipeline_file.clone(),
            library_name: self.library_name.clone(),
            fix_branch: self.fix_branch.clone(),
            pull_title: self.pull_title.clone(),
            directive: self.directive.clone(),
            latest,
        });
        Ok(RuleResult::fixable(self.name(), is_valid, &how_to_fix, fix))
    }

    fn configuration(&self) -> RuleConfiguration {
        RuleConfiguration::from([
            ("class".to_string(), self.name().to_string()),
            ("pipeline_file".to_string(), self.pipeline_file.clone()),
            (
                "library".to_string(),
                format!("{}/{}", self.library_owner, self.library_name),
            ),
            ("fix_branch".to_string(), self.fix_branch.clone()),
            (
                "latest_tag".to_string(),
                self.latest
                    .get()
                    .map(|r| r.tag.clone())
                    .unwrap_or_else(|| "<uninitialized>".to_string()),
            ),
        ])
    }
}

/// Fix procedure attached to [`UpToDateCiLibraryRule`] results.
struct CiLibraryFix {
    pipeline_file: String,
    library_name: String,
    fix_branch: String,
    pull_title: String,
    directive: LibraryDirective,
    latest: LatestRelease,
}

impl CiLibraryFix {
    fn pull_body(&self) -> String {
        format!(
            "This pull request was opened automatically by the repository auditor.\n\n\
             It pins `{}` to its latest release `{}` ({}).\n\n\
             Do not rename this pull request; the title tracks the fix across runs.",
            self.library_name, self.latest.tag, self.latest.html_url
        )
    }
}

#[async_trait]
impl RuleFix for CiLibraryFix {
    async fn apply(&self, host: &dyn HostClient, repo: &Repository) -> Result<()> {
        let base = gitops::commit_base(host, repo, &self.fix_branch).await?;

        // Recompute against the fix branch, not the default branch: the
        // branch may already carry the correction from an earlier run. A
        // branch without the pipeline file skips the commit but still gets
        // its pull request reconciled.
        let content = match host
            .file_content(repo, &self.fix_branch, &self.pipeline_file)
            .await
        {
            Ok(content) => Some(content),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        if let Some(content) = &content {
            let already_fixed = match self.directive.version_of(content) {
                Some(version) => version == self.latest.tag,
                None => true,
            };

            if !already_fixed {
                let rewritten = self
                    .directive
                    .rewrite(content, &self.latest.tag)
                    .ok_or_else(|| AuditError::Rule {
                        rule: "UpToDateCiLibraryRule".to_string(),
                        message: "directive disappeared between check and rewrite".to_string(),
                    })?;
                let message = format!("Update {} to {}", self.library_name, self.latest.tag);
                gitops::push_file_rewrite(
                    host,
                    repo,
                    &self.fix_branch,
                    &base,
                    &self.pipeline_file,
                    &rewritten,
                    &message,
                )
                .await?;
            }
        }

        gitops::reconcile_pull_request(
            host,
            repo,
            &self.fix_branch,
            &self.pull_title,
            &self.pull_body(),
        )
        .await?;
        Ok(())
    }
}
