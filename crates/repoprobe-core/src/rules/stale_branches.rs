//! Stale branch count check.

use async_trait::async_trait;

use crate::config::AuditConfig;
use crate::domain::error::Result;
use crate::domain::report::RuleResult;
use crate::domain::repository::Repository;
use crate::host::{HostClient, RuleConfiguration};
use crate::rules::Rule;

/// Valid when the repository has at most `max_stale_branches` branches
/// besides the default branch. A long tail of abandoned branches usually
/// means merged work was never cleaned up.
pub struct HasNotManyStaleBranchesRule {
    max_stale_branches: usize,
}

impl HasNotManyStaleBranchesRule {
    pub fn new(cfg: &AuditConfig) -> Self {
        HasNotManyStaleBranchesRule {
            max_stale_branches: cfg.max_stale_branches,
        }
    }
}

#[async_trait]
impl Rule for HasNotManyStaleBranchesRule {
    fn name(&self) -> &'static str {
        "HasNotManyStaleBranchesRule"
    }

    async fn check(&self, host: &dyn HostClient, repo: &Repository) -> Result<RuleResult> {
        let branches = host.list_branches(repo).await?;
        let stale = branches
            .iter()
            .filter(|b| b.name != repo.default_branch)
            .count();
        let is_valid = stale <= self.max_stale_branches;
        let how_to_fix = format!(
            "Delete merged and abandoned branches; keep at most {} besides {}.",
            self.max_stale_branches, repo.default_branch
        );
        Ok(RuleResult::check_only(self.name(), is_valid, &how_to_fix))
    }

    fn configuration(&self) -> RuleConfiguration {
        RuleConfiguration::from([
            ("class".to_string(), self.name().to_string()),
            (
                "max_stale_branches".to_string(),
                self.max_stale_branches.to_string(),
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::fakes::MemoryHost;

    fn repo() -> Repository {
        Repository {
            owner: "acme".to_string(),
            name: "repo1".to_string(),
            default_branch: "main".to_string(),
            html_url: "https://example.invalid/acme/repo1".to_string(),
            private: false,
            has_license: true,
            has_issues: true,
            description: None,
        }
    }

    #[tokio::test]
    async fn test_within_limit_is_valid() {
        let host = MemoryHost::new();
        let r = repo();
        host.add_repository(&r);
        host.seed_branch(&r, "feature/one");
        host.seed_branch(&r, "feature/two");
        let rule = HasNotManyStaleBranchesRule {
            max_stale_branches: 2,
        };
        assert!(rule.check(&host, &r).await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn test_over_limit_is_invalid() {
        let host = MemoryHost::new();
        let r = repo();
        host.add_repository(&r);
        for i in 0..3 {
            host.seed_branch(&r, &format!("feature/{i}"));
        }
        let rule = HasNotManyStaleBranchesRule {
            max_stale_branches: 2,
        };
        let result = rule.check(&host, &r).await.unwrap();
        assert!(!result.is_valid());
        assert!(result.how_to_fix.contains("at most 2"));
    }

    #[tokio::test]
    async fn test_default_branch_not_counted() {
        let host = MemoryHost::new();
        let r = repo();
        host.add_repository(&r);
        let rule = HasNotManyStaleBranchesRule {
            max_stale_branches: 0,
        };
        assert!(rule.check(&host, &r).await.unwrap().is_valid());
    }
}
