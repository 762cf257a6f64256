//! repoprobe daemon.
//!
//! Reads one trigger payload (`{"repository": {"name": ..., "owner":
//! {"login": ...}}}`) from stdin, dispatches it through the orchestration
//! dedup layer, and waits for the run to finish. Environment is resolved
//! here at the edge; nothing below this binary reads it.

use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, Level};

use repoprobe_core::{
    init_tracing, AuditConfig, Auditor, Dispatcher, GithubHost, MemoryOrchestrator, RunStatus,
};

#[tokio::main]
async fn main() -> Result<()> {
    let json_logs = std::env::var("REPOPROBE_LOG_FORMAT").as_deref() == Ok("json");
    init_tracing(json_logs, Level::INFO);

    let token = std::env::var("GITHUB_TOKEN").context("GITHUB_TOKEN is not set")?;
    let host = Arc::new(GithubHost::new(&token)?);
    let config = AuditConfig::default();
    let auditor = Arc::new(Auditor::new(host, &config));

    for rule_config in auditor.rule_configurations() {
        info!(event = "audit.rule_registered", rule = ?rule_config);
    }

    let orchestrator = Arc::new(MemoryOrchestrator::new(auditor));
    let dispatcher = Dispatcher::new(orchestrator.clone());

    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("reading trigger payload from stdin")?;

    let handle = dispatcher.dispatch_raw(&raw).await?;
    info!(
        event = "audit.handle",
        key = %handle.key,
        started = handle.started,
    );

    if handle.started {
        let status = orchestrator.wait_for_terminal(&handle.key).await;
        info!(event = "audit.terminal", key = %handle.key, status = ?status);
        if status != RunStatus::Completed {
            anyhow::bail!("audit for {} ended with status {:?}", handle.key, status);
        }
    }
    Ok(())
}
