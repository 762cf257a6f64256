//! Compliance rules and the static rule registry.
//!
//! A [`Rule`] is a single stateless compliance predicate over a repository
//! snapshot. Fixable rules attach a [`RuleFix`] procedure to their results;
//! callers branch on the [`crate::domain::report::Verdict`] variant.
//!
//! Registration is explicit: [`rule_registry`] maps rule identifiers to
//! factories in declaration order, which is also the evaluation and report
//! order. There is no runtime type discovery.

pub mod ci_library;
pub mod codeowners;
pub mod description;
pub mod license;
pub mod readme;
pub mod stale_branches;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AuditConfig;
use crate::domain::error::Result;
use crate::domain::report::RuleResult;
use crate::domain::repository::Repository;
use crate::host::{HostClient, RuleConfiguration};

pub use ci_library::UpToDateCiLibraryRule;
pub use codeowners::HasCodeownersRule;
pub use description::HasDescriptionRule;
pub use license::HasLicenseRule;
pub use readme::HasReadmeRule;
pub use stale_branches::HasNotManyStaleBranchesRule;

/// A single compliance check.
///
/// Rules are stateless after [`Rule::init`] and must never fail on an
/// empty repository: absent content answers the rule's own semantics
/// (usually "file absent"), it is not an error.
#[async_trait]
pub trait Rule: Send + Sync {
    /// Stable rule identifier; used in configuration ignore-sets, issue
    /// titles, and pull request titles.
    fn name(&self) -> &'static str;

    /// One-time setup, e.g. an upstream release lookup. Called
    /// sequentially by the engine before any validation.
    async fn init(&self, host: &dyn HostClient) -> Result<()> {
        let _ = host;
        Ok(())
    }

    /// Evaluate the rule against a repository snapshot.
    async fn check(&self, host: &dyn HostClient, repo: &Repository) -> Result<RuleResult>;

    /// Descriptive key→value mapping for status introspection. Includes at
    /// least the rule's type name under `"class"`.
    fn configuration(&self) -> RuleConfiguration;
}

/// The fix procedure a fixable rule attaches to its results.
#[async_trait]
pub trait RuleFix: Send + Sync {
    /// Converge the repository towards compliance: get-or-create the fix
    /// branch, skip the commit when the branch already satisfies the rule,
    /// otherwise rewrite the target file, then reconcile the pull request.
    async fn apply(&self, host: &dyn HostClient, repo: &Repository) -> Result<()>;
}

/// Factory signature used by the registry.
pub type RuleFactory = fn(&AuditConfig) -> Arc<dyn Rule>;

/// Static registry of all known rules, in declaration (= report) order.
pub fn rule_registry() -> Vec<(&'static str, RuleFactory)> {
    vec![
        ("HasDescriptionRule", |_| Arc::new(HasDescriptionRule)),
        ("HasLicenseRule", |_| Arc::new(HasLicenseRule)),
        ("HasReadmeRule", |_| Arc::new(HasReadmeRule)),
        ("HasCodeownersRule", |_| Arc::new(HasCodeownersRule)),
        ("HasNotManyStaleBranchesRule", |cfg| {
            Arc::new(HasNotManyStaleBranchesRule::new(cfg))
        }),
        ("UpToDateCiLibraryRule", |cfg| {
            Arc::new(UpToDateCiLibraryRule::new(cfg))
        }),
    ]
}

/// Instantiate every registered rule.
pub fn default_rules(cfg: &AuditConfig) -> Vec<Arc<dyn Rule>> {
    rule_registry()
        .into_iter()
        .map(|(_, factory)| factory(cfg))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_ids_match_rule_names() {
        let cfg = AuditConfig::default();
        for (id, factory) in rule_registry() {
            let rule = factory(&cfg);
            assert_eq!(rule.name(), id);
        }
    }

    #[test]
    fn test_every_rule_reports_its_class() {
        let cfg = AuditConfig::default();
        for rule in default_rules(&cfg) {
            let config = rule.configuration();
            assert_eq!(config.get("class").map(String::as_str), Some(rule.name()));
        }
    }
}
