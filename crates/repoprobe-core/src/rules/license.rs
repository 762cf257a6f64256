//! License presence check.

use async_trait::async_trait;

use crate::domain::error::Result;
use crate::domain::report::RuleResult;
use crate::domain::repository::Repository;
use crate::host::{HostClient, RuleConfiguration};
use crate::rules::Rule;

const HOW_TO_FIX: &str =
    "Add a LICENSE file at the repository root so the host can detect the license.";

/// Valid when the host detected a license file in the repository.
pub struct HasLicenseRule;

#[async_trait]
impl Rule for HasLicenseRule {
    fn name(&self) -> &'static str {
        "HasLicenseRule"
    }

    async fn check(&self, _host: &dyn HostClient, repo: &Repository) -> Result<RuleResult> {
        Ok(RuleResult::check_only(
            self.name(),
            repo.has_license,
            HOW_TO_FIX,
        ))
    }

    fn configuration(&self) -> RuleConfiguration {
        RuleConfiguration::from([("class".to_string(), self.name().to_string())])
    }
}
