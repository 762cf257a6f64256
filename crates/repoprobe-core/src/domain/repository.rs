//! Repository snapshot and per-repository configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Immutable snapshot of a hosted repository, fetched once per validation
/// run. Rules read from this snapshot instead of issuing their own metadata
/// fetches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repository {
    /// Owner login (user or organisation).
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// Default branch name (e.g. "main").
    pub default_branch: String,
    /// Web URL of the repository.
    pub html_url: String,
    /// Whether the repository is private.
    pub private: bool,
    /// Whether the host detected a license file.
    pub has_license: bool,
    /// Whether issue tracking is enabled.
    pub has_issues: bool,
    /// Free-form description, if any.
    pub description: Option<String>,
}

impl Repository {
    /// `"{owner}/{name}"` form used in log lines.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Orchestration dedup key: `"{owner}_{name}"`.
    pub fn dedup_key(&self) -> String {
        format!("{}_{}", self.owner, self.name)
    }
}

/// Well-known path of the per-repository opt-out document.
pub const REPO_CONFIG_PATH: &str = "repository-validator.json";

/// Per-repository configuration loaded from [`REPO_CONFIG_PATH`] on the
/// default branch.
///
/// Schema: `{"Version": "1", "IgnoredRules": ["HasLicenseRule", ...]}`.
/// An absent file is valid and equivalent to [`RepoConfig::default`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoConfig {
    /// Schema version of the document.
    #[serde(rename = "Version", default)]
    pub version: String,
    /// Rule identifiers this repository has opted out of.
    #[serde(rename = "IgnoredRules", default)]
    pub ignored_rules: BTreeSet<String>,
}

impl RepoConfig {
    /// Parse a configuration document from its JSON source.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Whether the given rule identifier is opted out.
    pub fn ignores(&self, rule_name: &str) -> bool {
        self.ignored_rules.contains(rule_name)
    }
}
