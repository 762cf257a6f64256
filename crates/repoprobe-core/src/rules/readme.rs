//! README presence check.

use async_trait::async_trait;

use crate::domain::error::Result;
use crate::domain::report::RuleResult;
use crate::domain::repository::Repository;
use crate::host::{HostClient, RuleConfiguration};
use crate::rules::Rule;

const HOW_TO_FIX: &str = "Add a README (e.g. README.md) at the repository root.";

/// Valid when a README file exists at the repository root.
///
/// The stem match is case-insensitive (`README`, `Readme.md`, `readme.rst`
/// all count). A repository with no content at its default branch counts
/// as "file absent", not as an error.
pub struct HasReadmeRule;

#[async_trait]
impl Rule for HasReadmeRule {
    fn name(&self) -> &'static str {
        "HasReadmeRule"
    }

    async fn check(&self, host: &dyn HostClient, repo: &Repository) -> Result<RuleResult> {
        let names = match host.list_dir(repo, &repo.default_branch, "").await {
            Ok(names) => names,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };
        let is_valid = names
            .iter()
            .any(|n| n.to_lowercase().starts_with("readme"));
        Ok(RuleResult::check_only(self.name(), is_valid, HOW_TO_FIX))
    }

    fn configuration(&self) -> RuleConfiguration {
        RuleConfiguration::from([("class".to_string(), self.name().to_string())])
    }
}
