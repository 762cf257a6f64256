//! CODEOWNERS presence check.

use async_trait::async_trait;

use crate::domain::error::Result;
use crate::domain::report::RuleResult;
use crate::domain::repository::Repository;
use crate::host::{HostClient, RuleConfiguration};
use crate::rules::Rule;

const HOW_TO_FIX: &str =
    "Add a non-empty CODEOWNERS file at the repository root, in .github/, or in docs/.";

/// Candidate locations, highest precedence first. The precedence is fixed
/// here instead of depending on remote listing order.
const CANDIDATES: &[&str] = &["CODEOWNERS", ".github/CODEOWNERS", "docs/CODEOWNERS"];

/// Valid when a non-empty CODEOWNERS file exists in one of the candidate
/// locations (root, then `.github`, then `docs`).
pub struct HasCodeownersRule;

#[async_trait]
impl Rule for HasCodeownersRule {
    fn name(&self) -> &'static str {
        "HasCodeownersRule"
    }

    async fn check(&self, host: &dyn HostClient, repo: &Repository) -> Result<RuleResult> {
        let mut is_valid = false;
        for path in CANDIDATES {
            match host.file_content(repo, &repo.default_branch, path).await {
                Ok(content) if !content.trim().is_empty() => {
                    is_valid = true;
                    break;
                }
                Ok(_) => break, // first hit wins, even when empty
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(RuleResult::check_only(self.name(), is_valid, HOW_TO_FIX))
    }

    fn configuration(&self) -> RuleConfiguration {
        RuleConfiguration::from([
            ("class".to_string(), self.name().to_string()),
            ("candidates".to_string(), CANDIDATES.join(", ")),
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
    async fn test_github_dir_candidate_found() {
        let host = MemoryHost::new();
        let r = repo();
        host.add_repository(&r);
        host.seed_file(&r, "main", ".github/CODEOWNERS", "* @acme/owners");
        let result = HasCodeownersRule.check(&host, &r).await.unwrap();
        assert!(result.is_valid());
    }

    #[tokio::test]
    async fn test_root_takes_precedence_even_when_empty() {
        let host = MemoryHost::new();
        let r = repo();
        host.add_repository(&r);
        host.seed_file(&r, "main", "CODEOWNERS", "   ");
        host.seed_file(&r, "main", "docs/CODEOWNERS", "* @acme/owners");
        let result = HasCodeownersRule.check(&host, &r).await.unwrap();
        assert!(!result.is_valid(), "empty root candidate must win");
    }

    #[tokio::test]
    async fn test_absent_everywhere_is_invalid() {
        let host = MemoryHost::new();
        let r = repo();
        host.add_empty_repository(&r);
        let result = HasCodeownersRule.check(&host, &r).await.unwrap();
        assert!(!result.is_valid());
    }
}
