//! repoprobe core library
//!
//! Audits hosted repositories against a fixed compliance rule set and
//! converges tracker issues and fix pull requests with the latest report.

pub mod audit;
pub mod config;
pub mod domain;
pub mod engine;
pub mod gitops;
pub mod host;
pub mod issues;
pub mod obs;
pub mod orchestration;
pub mod rules;
pub mod telemetry;

pub use audit::{AuditSummary, Auditor, FixFailure};
pub use config::AuditConfig;
pub use domain::{
    AuditError, RepoConfig, Report, Repository, Result, RuleResult, ValidationPayload, Verdict,
    REPO_CONFIG_PATH,
};
pub use engine::{load_repo_config, ValidationEngine};
pub use gitops::{commit_base, push_file_rewrite, reconcile_pull_request, PullAction};
pub use host::fakes::MemoryHost;
pub use host::github::GithubHost;
pub use host::{
    Branch, GitCommit, HostClient, ItemState, LatestRelease, PullRequest, RuleConfiguration,
    TrackerIssue,
};
pub use issues::{IssueReconciler, ReconcileOutcome};
pub use orchestration::{
    AuditActivity, Dispatcher, MemoryOrchestrator, OrchestrationHost, RunStatus, StatusHandle,
};
pub use rules::{default_rules, rule_registry, Rule, RuleFix};
pub use telemetry::init_tracing;

/// repoprobe version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
