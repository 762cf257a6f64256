//! Issue-state reconciliation.
//!
//! Converges a repository's open tracker issues with the latest validation
//! report. Identity is the deterministic title `"{prefix} {rule_name}"`;
//! bodies and numbers are never consulted.

use tracing::{debug, info};

use crate::config::AuditConfig;
use crate::domain::error::Result;
use crate::domain::report::Report;
use crate::host::{HostClient, ItemState};

/// Counters for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub created: usize,
    pub closed: usize,
}

/// Diffs validation reports against open tracker issues.
pub struct IssueReconciler {
    title_prefix: String,
}

impl IssueReconciler {
    pub fn new(cfg: &AuditConfig) -> Self {
        IssueReconciler {
            title_prefix: cfg.issue_title_prefix.clone(),
        }
    }

    /// Deterministic issue title for a rule.
    pub fn title_for(&self, rule_name: &str) -> String {
        format!("{} {}", self.title_prefix, rule_name)
    }

    /// Converge tracker state with the given reports.
    ///
    /// - empty input: returns without any host call;
    /// - repositories with issue tracking disabled are skipped entirely;
    /// - per result: invalid without a matching open issue → create;
    ///   valid with a matching open issue → close; everything else is a
    ///   no-op (an open issue for a still-invalid rule is left untouched).
    pub async fn report(
        &self,
        host: &dyn HostClient,
        reports: &[Report],
    ) -> Result<ReconcileOutcome> {
        let mut outcome = ReconcileOutcome::default();
        if reports.is_empty() {
            return Ok(outcome);
        }

        for report in reports {
            let repo = &report.repository;
            if !repo.has_issues {
                debug!(repo = %repo.full_name(), "issue tracking disabled, skipping");
                continue;
            }

            let open = host.open_issues(repo).await?;
            let mut created = 0usize;
            let mut closed = 0usize;
            for result in &report.results {
                let title = self.title_for(&result.rule_name);
                let existing = open.iter().find(|issue| issue.title == title);
                match (existing, result.is_valid()) {
                    (None, false) => {
                        host.create_issue(repo, &title, &result.how_to_fix).await?;
                        created += 1;
                    }
                    (Some(issue), true) => {
                        host.set_issue_state(repo, issue.number, ItemState::Closed)
                            .await?;
                        closed += 1;
                    }
                    _ => {}
                }
            }
            info!(
                repo = %repo.full_name(),
                created = created,
                closed = closed,
                "issues reconciled"
            );
            outcome.created += created;
            outcome.closed += closed;
        }
        Ok(outcome)
    }
}
