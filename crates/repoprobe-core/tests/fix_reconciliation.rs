//! End-to-end fix behavior for the CI-library rule: branch creation,
//! single-commit rewrites, and pull request convergence across runs.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use repoprobe_core::rules::UpToDateCiLibraryRule;
use repoprobe_core::{
    AuditConfig, AuditError, Auditor, HostClient, IssueReconciler, ItemState, MemoryHost,
    PullRequest, Repository, Result, Rule, RuleConfiguration, RuleFix, RuleResult,
    ValidationEngine, ValidationPayload,
};

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

fn config() -> AuditConfig {
    AuditConfig {
        library_owner: "acme".to_string(),
        library_name: "x".to_string(),
        ..AuditConfig::default()
    }
}

const FIX_BRANCH: &str = "feature/x-update";
const PULL_TITLE: &str = "[Automatic Validation] UpToDateCiLibraryRule";

async fn checked_rule(host: &MemoryHost, r: &Repository) -> repoprobe_core::RuleResult {
    let rule = UpToDateCiLibraryRule::new(&config());
    rule.init(host).await.unwrap();
    rule.check(host, r).await.unwrap()
}

#[tokio::test]
async fn fix_rewrites_file_and_opens_pull_request() {
    let host = MemoryHost::new();
    let r = repo();
    host.add_repository(&r);
    host.seed_file(&r, "main", "Jenkinsfile", "library 'x@0.3.0'\nnode { }");
    host.seed_release("acme", "x", "0.3.2");

    let result = checked_rule(&host, &r).await;
    assert!(!result.is_valid());
    result.fix().unwrap().apply(&host, &r).await.unwrap();

    // Branch was created from the default branch and carries the rewrite.
    assert!(host
        .branches_snapshot(&r)
        .iter()
        .any(|b| b.name == FIX_BRANCH));
    let content = host.file_content(&r, FIX_BRANCH, "Jenkinsfile").await.unwrap();
    assert_eq!(content, "library 'x@0.3.2'\nnode { }");

    let pulls = host.pulls_snapshot(&r);
    assert_eq!(pulls.len(), 1);
    assert_eq!(pulls[0].title, PULL_TITLE);
    assert_eq!(pulls[0].state, ItemState::Open);
    assert!(pulls[0].head_branch == FIX_BRANCH);
}

#[tokio::test]
async fn second_fix_run_creates_nothing_new() {
    let host = MemoryHost::new();
    let r = repo();
    host.add_repository(&r);
    host.seed_file(&r, "main", "Jenkinsfile", "library 'x@0.3.0'");
    host.seed_release("acme", "x", "0.3.2");

    let result = checked_rule(&host, &r).await;
    result.fix().unwrap().apply(&host, &r).await.unwrap();
    let commits_after_first = host.calls("create_commit");

    // No external change between runs: fix branch already satisfies the
    // rule, so the second run must neither commit nor open another PR.
    let result = checked_rule(&host, &r).await;
    assert!(!result.is_valid(), "default branch is still stale");
    result.fix().unwrap().apply(&host, &r).await.unwrap();

    assert_eq!(host.calls("create_commit"), commits_after_first);
    assert_eq!(host.calls("create_branch"), 1);
    assert_eq!(host.pulls_snapshot(&r).len(), 1);
}

#[tokio::test]
async fn closed_unmerged_pull_with_live_branch_is_reopened() {
    let host = MemoryHost::new();
    let r = repo();
    host.add_repository(&r);
    host.seed_file(&r, "main", "Jenkinsfile", "library 'x@0.3.0'");
    host.seed_release("acme", "x", "0.3.2");

    let result = checked_rule(&host, &r).await;
    result.fix().unwrap().apply(&host, &r).await.unwrap();

    // Someone closes the PR without merging; the branch stays.
    let number = host.pulls_snapshot(&r)[0].number;
    host.set_pull_state(&r, number, ItemState::Closed)
        .await
        .unwrap();

    let result = checked_rule(&host, &r).await;
    result.fix().unwrap().apply(&host, &r).await.unwrap();

    let pulls = host.pulls_snapshot(&r);
    assert_eq!(pulls.len(), 1, "reopened, not duplicated");
    assert_eq!(pulls[0].state, ItemState::Open);
}

#[tokio::test]
async fn pipeline_gone_from_fix_branch_still_reconciles_pull_request() {
    let host = MemoryHost::new();
    let r = repo();
    host.add_repository(&r);
    host.seed_file(&r, "main", "Jenkinsfile", "library 'x@0.3.0'");
    host.seed_release("acme", "x", "0.3.2");
    // A fix branch without the pipeline file, and its PR closed unmerged.
    host.seed_branch(&r, FIX_BRANCH);
    let branch_sha = host.branch(&r, FIX_BRANCH).await.unwrap().sha;
    host.seed_pull(
        &r,
        PullRequest {
            number: 4,
            title: PULL_TITLE.to_string(),
            state: ItemState::Closed,
            merged: false,
            head_branch: FIX_BRANCH.to_string(),
            head_sha: branch_sha,
            updated_at: Utc::now(),
        },
    );

    let result = checked_rule(&host, &r).await;
    result.fix().unwrap().apply(&host, &r).await.unwrap();

    // Nothing to rewrite, but the closed pull request is recovered.
    assert_eq!(host.calls("create_commit"), 0);
    let pulls = host.pulls_snapshot(&r);
    assert_eq!(pulls.len(), 1);
    assert_eq!(pulls[0].state, ItemState::Open);
}

#[tokio::test]
async fn stale_recorded_head_is_not_reopened() {
    let host = MemoryHost::new();
    let r = repo();
    host.add_repository(&r);
    host.seed_file(&r, "main", "Jenkinsfile", "library 'x@0.3.0'");
    host.seed_release("acme", "x", "0.3.2");
    host.seed_branch(&r, FIX_BRANCH);
    host.seed_file(&r, FIX_BRANCH, "Jenkinsfile", "library 'x@0.3.1'");

    // A closed PR recorded against an older head commit of the branch.
    host.seed_pull(
        &r,
        PullRequest {
            number: 9,
            title: PULL_TITLE.to_string(),
            state: ItemState::Closed,
            merged: false,
            head_branch: FIX_BRANCH.to_string(),
            head_sha: "0000000000000000000000000000000000000000".to_string(),
            updated_at: Utc::now(),
        },
    );

    let result = checked_rule(&host, &r).await;
    result.fix().unwrap().apply(&host, &r).await.unwrap();

    let pulls = host.pulls_snapshot(&r);
    assert_eq!(pulls.len(), 2, "a fresh PR is created instead");
    assert_eq!(
        pulls.iter().find(|p| p.number == 9).unwrap().state,
        ItemState::Closed
    );
    assert!(pulls
        .iter()
        .any(|p| p.state == ItemState::Open && p.title == PULL_TITLE));
}

struct RecordingFix {
    rule_name: &'static str,
    fail: bool,
    applied: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl RuleFix for RecordingFix {
    async fn apply(&self, _host: &dyn HostClient, _repo: &Repository) -> Result<()> {
        self.applied.lock().unwrap().push(self.rule_name);
        if self.fail {
            return Err(AuditError::Rule {
                rule: self.rule_name.to_string(),
                message: "push rejected".to_string(),
            });
        }
        Ok(())
    }
}

struct AlwaysInvalidFixableRule {
    rule_name: &'static str,
    fix: Arc<RecordingFix>,
}

#[async_trait]
impl Rule for AlwaysInvalidFixableRule {
    fn name(&self) -> &'static str {
        self.rule_name
    }

    async fn check(&self, _host: &dyn HostClient, _repo: &Repository) -> Result<RuleResult> {
        Ok(RuleResult::fixable(
            self.rule_name,
            false,
            "apply the fix",
            self.fix.clone(),
        ))
    }

    fn configuration(&self) -> RuleConfiguration {
        RuleConfiguration::from([("class".to_string(), self.rule_name.to_string())])
    }
}

#[tokio::test]
async fn failing_fix_is_isolated_and_later_fixes_still_run() {
    let host = Arc::new(MemoryHost::new());
    let r = repo();
    host.add_repository(&r);

    let applied = Arc::new(Mutex::new(Vec::new()));
    let engine = ValidationEngine::new(vec![
        Arc::new(AlwaysInvalidFixableRule {
            rule_name: "FirstRule",
            fix: Arc::new(RecordingFix {
                rule_name: "FirstRule",
                fail: true,
                applied: applied.clone(),
            }),
        }),
        Arc::new(AlwaysInvalidFixableRule {
            rule_name: "SecondRule",
            fix: Arc::new(RecordingFix {
                rule_name: "SecondRule",
                fail: false,
                applied: applied.clone(),
            }),
        }),
    ]);
    let auditor = Auditor::with_parts(
        host.clone(),
        engine,
        IssueReconciler::new(&AuditConfig::default()),
    );

    let payload = ValidationPayload {
        owner: "acme".to_string(),
        name: "repo1".to_string(),
    };
    let summary = auditor.run_audit(&payload).await.unwrap();

    // The failing first fix does not stop the second, and the run itself
    // succeeds with the failure collected.
    assert_eq!(*applied.lock().unwrap(), vec!["FirstRule", "SecondRule"]);
    assert_eq!(summary.fix_failures.len(), 1);
    assert_eq!(summary.fix_failures[0].rule_name, "FirstRule");
    assert!(summary.fix_failures[0].message.contains("push rejected"));
}
