//! Audit settings threaded explicitly through constructors.
//!
//! There are no ambient environment reads inside rule or engine logic; the
//! daemon resolves its environment at the edge and builds one
//! [`AuditConfig`] for the process.

use serde::{Deserialize, Serialize};

/// Settings shared by the rules, the fix machinery, and the reconcilers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Title prefix for tracker issues opened by the reconciler.
    pub issue_title_prefix: String,
    /// Title prefix for automated fix pull requests.
    pub pull_title_prefix: String,
    /// Branch name prefix for fix branches.
    pub fix_branch_prefix: String,
    /// Pipeline file inspected by the CI-library rule.
    pub pipeline_file: String,
    /// Owner of the shared pipeline library repository.
    pub library_owner: String,
    /// Name of the shared pipeline library.
    pub library_name: String,
    /// Branch count above which the stale-branch rule reports a violation.
    pub max_stale_branches: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        AuditConfig {
            issue_title_prefix: "[Automatic validation]".to_string(),
            pull_title_prefix: "[Automatic Validation]".to_string(),
            fix_branch_prefix: "feature/".to_string(),
            pipeline_file: "Jenkinsfile".to_string(),
            library_owner: "acme".to_string(),
            library_name: "pipeline-library".to_string(),
            max_stale_branches: 10,
        }
    }
}

impl AuditConfig {
    /// Deterministic fix branch name for the configured pipeline library.
    pub fn library_fix_branch(&self) -> String {
        format!("{}{}-update", self.fix_branch_prefix, self.library_name)
    }

    /// Deterministic issue title for a rule.
    pub fn issue_title(&self, rule_name: &str) -> String {
        format!("{} {}", self.issue_title_prefix, rule_name)
    }

    /// Deterministic pull request title for a rule.
    pub fn pull_title(&self, rule_name: &str) -> String {
        format!("{} {}", self.pull_title_prefix, rule_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_names() {
        let cfg = AuditConfig::default();
        assert_eq!(cfg.library_fix_branch(), "feature/pipeline-library-update");
        assert_eq!(
            cfg.issue_title("HasLicenseRule"),
            "[Automatic validation] HasLicenseRule"
        );
        assert_eq!(
            cfg.pull_title("UpToDateCiLibraryRule"),
            "[Automatic Validation] UpToDateCiLibraryRule"
        );
    }
}
