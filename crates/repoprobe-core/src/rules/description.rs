//! Repository description check.

use async_trait::async_trait;

use crate::domain::error::Result;
use crate::domain::report::RuleResult;
use crate::domain::repository::Repository;
use crate::host::{HostClient, RuleConfiguration};
use crate::rules::Rule;

const HOW_TO_FIX: &str =
    "Add a short description in the repository settings so readers can tell what it is for.";

/// Valid when the repository has a non-empty description.
pub struct HasDescriptionRule;

#[async_trait]
impl Rule for HasDescriptionRule {
    fn name(&self) -> &'static str {
        "HasDescriptionRule"
    }

    async fn check(&self, _host: &dyn HostClient, repo: &Repository) -> Result<RuleResult> {
        let is_valid = repo
            .description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty());
        Ok(RuleResult::check_only(self.name(), is_valid, HOW_TO_FIX))
    }

    fn configuration(&self) -> RuleConfiguration {
        RuleConfiguration::from([("class".to_string(), self.name().to_string())])
    }
}
