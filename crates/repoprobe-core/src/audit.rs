//! The orchestrated audit activity.
//!
//! One run: fetch the repository snapshot, initialise the rules, validate,
//! reconcile tracker issues, then apply automated fixes for invalid
//! fixable results sequentially in report order. A failing fix is isolated
//! (logged and collected); only validation or reporting failures fail the
//! run.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AuditConfig;
use crate::domain::error::Result;
use crate::domain::payload::ValidationPayload;
use crate::domain::report::Report;
use crate::engine::ValidationEngine;
use crate::host::{HostClient, RuleConfiguration};
use crate::issues::{IssueReconciler, ReconcileOutcome};
use crate::obs;
use crate::orchestration::AuditActivity;

/// A fix that failed during a run. The run itself still completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixFailure {
    pub rule_name: String,
    pub message: String,
}

/// Everything one audit run produced.
#[derive(Debug, Clone)]
pub struct AuditSummary {
    pub report: Report,
    pub issues: ReconcileOutcome,
    pub fix_failures: Vec<FixFailure>,
}

/// Wires the engine, the issue reconciler, and the hosting client into the
/// single activity the orchestration layer runs.
pub struct Auditor {
    host: Arc<dyn HostClient>,
    engine: ValidationEngine,
    reconciler: IssueReconciler,
}

impl Auditor {
    /// Auditor over the full static rule registry.
    pub fn new(host: Arc<dyn HostClient>, cfg: &AuditConfig) -> Self {
        Auditor {
            host,
            engine: ValidationEngine::with_default_rules(cfg),
            reconciler: IssueReconciler::new(cfg),
        }
    }

    /// Auditor over explicit parts (tests, custom rule sets).
    pub fn with_parts(
        host: Arc<dyn HostClient>,
        engine: ValidationEngine,
        reconciler: IssueReconciler,
    ) -> Self {
        Auditor {
            host,
            engine,
            reconciler,
        }
    }

    /// Per-rule configuration mappings for the status endpoint.
    pub fn rule_configurations(&self) -> Vec<RuleConfiguration> {
        self.engine.rule_configurations()
    }

    /// Execute one audit run.
    pub async fn run_audit(&self, payload: &ValidationPayload) -> Result<AuditSummary> {
        let key = payload.dedup_key();
        obs::emit_audit_started(&key);

        let host = self.host.as_ref();
        let repo = host.repository(&payload.owner, &payload.name).await?;

        self.engine.init(host).await?;
        let report = self.engine.validate(host, &repo, false).await?;
        let issues = self
            .reconciler
            .report(host, std::slice::from_ref(&report))
            .await?;

        let mut fix_failures = Vec::new();
        for result in report.invalid_results() {
            let Some(fix) = result.fix() else { continue };
            match fix.apply(host, &repo).await {
                Ok(()) => obs::emit_fix_applied(&key, &result.rule_name),
                Err(e) => {
                    obs::emit_fix_failed(&key, &result.rule_name, &e);
                    fix_failures.push(FixFailure {
                        rule_name: result.rule_name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let invalid = report.invalid_results().count();
        obs::emit_audit_finished(&key, report.results.len(), invalid, fix_failures.len());
        Ok(AuditSummary {
            report,
            issues,
            fix_failures,
        })
    }
}

#[async_trait]
impl AuditActivity for Auditor {
    async fn run(&self, input: ValidationPayload) -> Result<()> {
        self.run_audit(&input).await.map(|_| ())
    }
}
