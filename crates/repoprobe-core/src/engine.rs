//! Validation engine: configuration-filtered, concurrent rule execution.

use std::sync::Arc;

use tracing::debug;

use crate::config::AuditConfig;
use crate::domain::error::Result;
use crate::domain::report::Report;
use crate::domain::repository::{RepoConfig, Repository, REPO_CONFIG_PATH};
use crate::host::{HostClient, RuleConfiguration};
use crate::rules::{default_rules, Rule};

/// Load the per-repository opt-out document from its well-known path.
///
/// An absent file is the common case and yields the default (empty)
/// ignore-set; a present but malformed file is an error.
pub async fn load_repo_config(host: &dyn HostClient, repo: &Repository) -> Result<RepoConfig> {
    match host
        .file_content(repo, &repo.default_branch, REPO_CONFIG_PATH)
        .await
    {
        Ok(raw) => Ok(RepoConfig::from_json(&raw)?),
        Err(e) if e.is_not_found() => Ok(RepoConfig::default()),
        Err(e) => Err(e),
    }
}

/// Applies the ordered rule set to one repository and assembles a
/// [`Report`].
pub struct ValidationEngine {
    rules: Vec<Arc<dyn Rule>>,
}

impl ValidationEngine {
    /// Engine over an explicit rule list (declaration order = report
    /// order).
    pub fn new(rules: Vec<Arc<dyn Rule>>) -> Self {
        ValidationEngine { rules }
    }

    /// Engine over the full static registry.
    pub fn with_default_rules(cfg: &AuditConfig) -> Self {
        Self::new(default_rules(cfg))
    }

    /// Initialise every rule, sequentially.
    ///
    /// Rule initialisation may perform a network fetch; this step is
    /// deliberately not parallelised so rule-internal rate limits stay
    /// predictable.
    pub async fn init(&self, host: &dyn HostClient) -> Result<()> {
        for rule in &self.rules {
            rule.init(host).await?;
        }
        Ok(())
    }

    /// Validate one repository snapshot.
    ///
    /// Rules whose identifier appears in the repository's ignore-set are
    /// skipped unless `override_rule_ignore` is set. The selected rules
    /// run concurrently; any single rule failure fails the whole report.
    pub async fn validate(
        &self,
        host: &dyn HostClient,
        repo: &Repository,
        override_rule_ignore: bool,
    ) -> Result<Report> {
        let config = load_repo_config(host, repo).await?;
        let selected: Vec<&Arc<dyn Rule>> = self
            .rules
            .iter()
            .filter(|rule| override_rule_ignore || !config.ignores(rule.name()))
            .collect();
        debug!(
            repo = %repo.full_name(),
            selected = selected.len(),
            ignored = self.rules.len() - selected.len(),
            "validating"
        );

        let checks = selected.iter().map(|rule| rule.check(host, repo));
        // try_join_all preserves input order, so results stay in
        // declaration order.
        let results = futures::future::try_join_all(checks).await?;

        Ok(Report {
            repository: repo.clone(),
            results,
        })
    }

    /// Per-rule configuration mappings for the status endpoint.
    pub fn rule_configurations(&self) -> Vec<RuleConfiguration> {
        self.rules.iter().map(|rule| rule.configuration()).collect()
    }
}
