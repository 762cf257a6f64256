//! Validation report types.
//!
//! A [`Report`] is the output of one validation run: the repository
//! snapshot plus one [`RuleResult`] per evaluated rule, in evaluation
//! order (declaration order after configuration filtering). Consumers are
//! the issue reconciler and the fix executor; results are never mutated
//! after creation.

use std::fmt;
use std::sync::Arc;

use crate::domain::repository::Repository;
use crate::rules::RuleFix;

/// Outcome variant of a rule check.
///
/// Fixable rules carry their fix procedure; check-only rules do not.
/// Callers branch on the variant rather than probing an optional field.
#[derive(Clone)]
pub enum Verdict {
    /// The rule can only detect, not repair.
    CheckOnly { is_valid: bool },
    /// The rule carries an automated fix procedure.
    Fixable {
        is_valid: bool,
        fix: Arc<dyn RuleFix>,
    },
}

impl fmt::Debug for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::CheckOnly { is_valid } => f
                .debug_struct("CheckOnly")
                .field("is_valid", is_valid)
                .finish(),
            Verdict::Fixable { is_valid, .. } => f
                .debug_struct("Fixable")
                .field("is_valid", is_valid)
                .finish_non_exhaustive(),
        }
    }
}

/// Result of evaluating a single rule against a repository.
#[derive(Debug, Clone)]
pub struct RuleResult {
    /// Identifier of the rule that produced this result.
    pub rule_name: String,
    /// Human-readable remediation guidance; used as the issue body.
    pub how_to_fix: String,
    /// Check outcome, with the fix procedure when the rule is fixable.
    pub verdict: Verdict,
}

impl RuleResult {
    /// Construct a check-only result.
    pub fn check_only(rule_name: &str, is_valid: bool, how_to_fix: &str) -> Self {
        RuleResult {
            rule_name: rule_name.to_string(),
            how_to_fix: how_to_fix.to_string(),
            verdict: Verdict::CheckOnly { is_valid },
        }
    }

    /// Construct a fixable result carrying its fix procedure.
    pub fn fixable(
        rule_name: &str,
        is_valid: bool,
        how_to_fix: &str,
        fix: Arc<dyn RuleFix>,
    ) -> Self {
        RuleResult {
            rule_name: rule_name.to_string(),
            how_to_fix: how_to_fix.to_string(),
            verdict: Verdict::Fixable { is_valid, fix },
        }
    }

    /// Whether the rule held.
    pub fn is_valid(&self) -> bool {
        match &self.verdict {
            Verdict::CheckOnly { is_valid } => *is_valid,
            Verdict::Fixable { is_valid, .. } => *is_valid,
        }
    }

    /// The fix procedure, when this result is fixable.
    pub fn fix(&self) -> Option<&Arc<dyn RuleFix>> {
        match &self.verdict {
            Verdict::CheckOnly { .. } => None,
            Verdict::Fixable { fix, .. } => Some(fix),
        }
    }
}

/// Aggregated output of one validation run.
#[derive(Debug, Clone)]
pub struct Report {
    /// Snapshot the run was evaluated against.
    pub repository: Repository,
    /// One result per evaluated rule, in evaluation order.
    pub results: Vec<RuleResult>,
}

impl Report {
    pub fn owner(&self) -> &str {
        &self.repository.owner
    }

    pub fn repository_name(&self) -> &str {
        &self.repository.name
    }

    pub fn repository_url(&self) -> &str {
        &self.repository.html_url
    }

    /// Results for rules that did not hold, in evaluation order.
    pub fn invalid_results(&self) -> impl Iterator<Item = &RuleResult> {
        self.results.iter().filter(|r| !r.is_valid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_check_only_result() {
        let r = RuleResult::check_only("HasLicenseRule", false, "Add a LICENSE file.");
        assert!(!r.is_valid());
        assert!(r.fix().is_none());
    }

    #[test]
    fn test_invalid_results_preserve_order() {
        let report = Report {
            repository: repo(),
            results: vec![
                RuleResult::check_only("A", false, "fix a"),
                RuleResult::check_only("B", true, "fix b"),
                RuleResult::check_only("C", false, "fix c"),
            ],
        };
        let names: Vec<&str> = report
            .invalid_results()
            .map(|r| r.rule_name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "C"]);
    }
}
