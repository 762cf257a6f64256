//! Dispatch dedup protocol and the end-to-end orchestrated audit.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use repoprobe_core::{
    AuditConfig, AuditError, Auditor, Dispatcher, MemoryHost, MemoryOrchestrator,
    OrchestrationHost, Repository, Result, RunStatus, ValidationPayload,
};

/// Orchestration host with a preset status that records start calls.
struct ScriptedOrchestrator {
    status: RunStatus,
    starts: Mutex<Vec<String>>,
}

impl ScriptedOrchestrator {
    fn with_status(status: RunStatus) -> Arc<Self> {
        Arc::new(ScriptedOrchestrator {
            status,
            starts: Mutex::new(Vec::new()),
        })
    }

    fn started_keys(&self) -> Vec<String> {
        self.starts.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrchestrationHost for ScriptedOrchestrator {
    async fn status(&self, _key: &str) -> Result<RunStatus> {
        Ok(self.status)
    }

    async fn start_new(&self, key: &str, _input: ValidationPayload) -> Result<()> {
        self.starts.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

const PAYLOAD: &str = r#"{"repository": {"name": "repo1", "owner": {"login": "acme"}}}"#;

#[tokio::test]
async fn running_instance_is_not_restarted() {
    let orchestrator = ScriptedOrchestrator::with_status(RunStatus::Running);
    let dispatcher = Dispatcher::new(orchestrator.clone());

    let handle = dispatcher.dispatch_raw(PAYLOAD).await.unwrap();
    assert_eq!(handle.key, "acme_repo1");
    assert_eq!(handle.observed, RunStatus::Running);
    assert!(!handle.started);
    assert!(orchestrator.started_keys().is_empty());
}

#[tokio::test]
async fn terminal_instance_is_replaced() {
    for status in [
        RunStatus::Completed,
        RunStatus::Failed,
        RunStatus::Canceled,
        RunStatus::Terminated,
    ] {
        let orchestrator = ScriptedOrchestrator::with_status(status);
        let dispatcher = Dispatcher::new(orchestrator.clone());

        let handle = dispatcher.dispatch_raw(PAYLOAD).await.unwrap();
        assert!(handle.started, "{status:?} must allow a new run");
        assert_eq!(orchestrator.started_keys(), vec!["acme_repo1".to_string()]);
    }
}

#[tokio::test]
async fn absent_instance_is_started() {
    let orchestrator = ScriptedOrchestrator::with_status(RunStatus::NotStarted);
    let dispatcher = Dispatcher::new(orchestrator.clone());

    let handle = dispatcher.dispatch_raw(PAYLOAD).await.unwrap();
    assert!(handle.started);
    assert_eq!(orchestrator.started_keys(), vec!["acme_repo1".to_string()]);
}

#[tokio::test]
async fn malformed_payload_is_rejected_before_any_orchestration() {
    let orchestrator = ScriptedOrchestrator::with_status(RunStatus::NotStarted);
    let dispatcher = Dispatcher::new(orchestrator.clone());

    let err = dispatcher
        .dispatch_raw(r#"{"repository": {"name": "repo1"}}"#)
        .await
        .unwrap_err();
    match err {
        AuditError::BadRequest { messages } => {
            assert!(messages.contains(&"repository.owner is required".to_string()));
        }
        other => panic!("expected BadRequest, got {other:?}"),
    }
    assert!(orchestrator.started_keys().is_empty());
}

fn repo() -> Repository {
    Repository {
        owner: "acme".to_string(),
        name: "repo1".to_string(),
        default_branch: "main".to_string(),
        html_url: "https://example.invalid/acme/repo1".to_string(),
        private: false,
        has_license: false,
        has_issues: true,
        description: Some("demo".to_string()),
    }
}

#[tokio::test]
async fn dispatched_audit_runs_to_completion_and_reports() {
    let host = Arc::new(MemoryHost::new());
    let r = repo();
    host.add_repository(&r);
    host.seed_file(&r, "main", "README.md", "# demo");
    host.seed_file(&r, "main", "CODEOWNERS", "* @acme/owners");
    host.seed_release("acme", "pipeline-library", "1.0.0");

    let auditor = Arc::new(Auditor::new(host.clone(), &AuditConfig::default()));
    let orchestrator = Arc::new(MemoryOrchestrator::new(auditor));
    let dispatcher = Dispatcher::new(orchestrator.clone());

    let handle = dispatcher.dispatch_raw(PAYLOAD).await.unwrap();
    assert!(handle.started);
    let status = orchestrator.wait_for_terminal(&handle.key).await;
    assert_eq!(status, RunStatus::Completed);

    // The repository has no license, so the run leaves one open issue.
    let issues = host.issues_snapshot(&r);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].title, "[Automatic validation] HasLicenseRule");
}

#[tokio::test]
async fn missing_repository_fails_the_run() {
    let host = Arc::new(MemoryHost::new());
    let auditor = Arc::new(Auditor::new(host, &AuditConfig::default()));
    let orchestrator = Arc::new(MemoryOrchestrator::new(auditor));
    let dispatcher = Dispatcher::new(orchestrator.clone());

    let handle = dispatcher.dispatch_raw(PAYLOAD).await.unwrap();
    assert!(handle.started);
    let status = orchestrator.wait_for_terminal(&handle.key).await;
    assert_eq!(status, RunStatus::Failed);
}

#[tokio::test]
async fn completed_run_allows_a_fresh_dispatch() {
    let host = Arc::new(MemoryHost::new());
    let r = repo();
    host.add_repository(&r);
    host.seed_file(&r, "main", "README.md", "# demo");
    host.seed_file(&r, "main", "CODEOWNERS", "* @acme/owners");
    host.seed_release("acme", "pipeline-library", "1.0.0");

    let auditor = Arc::new(Auditor::new(host.clone(), &AuditConfig::default()));
    let orchestrator = Arc::new(MemoryOrchestrator::new(auditor));
    let dispatcher = Dispatcher::new(orchestrator.clone());

    let first = dispatcher.dispatch_raw(PAYLOAD).await.unwrap();
    orchestrator.wait_for_terminal(&first.key).await;
    let first_id = orchestrator.instance_id(&first.key).unwrap();

    let second = dispatcher.dispatch_raw(PAYLOAD).await.unwrap();
    assert!(second.started);
    orchestrator.wait_for_terminal(&second.key).await;
    assert_ne!(orchestrator.instance_id(&second.key).unwrap(), first_id);

    // Reconciliation is idempotent: the second run creates no second issue.
    assert_eq!(host.issues_snapshot(&r).len(), 1);
}
