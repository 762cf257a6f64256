//! Orchestration dedup layer.
//!
//! At most one in-flight audit per repository identity. The durable
//! orchestration engine itself is an injected collaborator
//! ([`OrchestrationHost`]); this module reproduces the dedup protocol, not
//! the storage substrate: look up the instance by key, start a new one
//! only when none exists or the existing one is terminal, and always
//! answer immediately with a pollable status handle.
//!
//! Known race: two near-simultaneous triggers for the same key can both
//! observe an absent/terminal instance and both start. Dedup here is
//! advisory, based on remote status, not a lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::{AuditError, Result};
use crate::domain::payload::ValidationPayload;
use crate::obs;

/// Runtime status of an orchestration instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    NotStarted,
    Running,
    Completed,
    Failed,
    Canceled,
    Terminated,
}

impl RunStatus {
    /// Whether the instance has finished (for any reason).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Canceled | RunStatus::Terminated
        )
    }
}

/// The injected durable-orchestration collaborator.
#[async_trait]
pub trait OrchestrationHost: Send + Sync {
    /// Status of the instance with the given key; `NotStarted` when none
    /// exists.
    async fn status(&self, key: &str) -> Result<RunStatus>;

    /// Start a new instance with the given key and trigger input.
    async fn start_new(&self, key: &str, input: ValidationPayload) -> Result<()>;
}

/// Pollable handle returned to the trigger caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHandle {
    /// Orchestration key: `"{owner}_{name}"`.
    pub key: String,
    /// Status observed at dispatch time, before any start.
    pub observed: RunStatus,
    /// Whether this dispatch started a new instance.
    pub started: bool,
}

/// The trigger boundary: validates payloads and applies the dedup
/// protocol.
pub struct Dispatcher {
    orchestrator: Arc<dyn OrchestrationHost>,
}

impl Dispatcher {
    pub fn new(orchestrator: Arc<dyn OrchestrationHost>) -> Self {
        Dispatcher { orchestrator }
    }

    /// Parse a raw JSON trigger payload and dispatch it.
    pub async fn dispatch_raw(&self, raw: &str) -> Result<StatusHandle> {
        let payload = ValidationPayload::parse(raw)?;
        self.dispatch(payload).await
    }

    /// Apply the dedup protocol for one validated payload.
    ///
    /// Never blocks on the orchestrated work; the handle is returned as
    /// soon as the start decision is made.
    pub async fn dispatch(&self, payload: ValidationPayload) -> Result<StatusHandle> {
        let key = payload.dedup_key();
        let observed = self.orchestrator.status(&key).await?;
        let start = observed == RunStatus::NotStarted || observed.is_terminal();
        if start {
            self.orchestrator.start_new(&key, payload).await?;
            obs::emit_audit_dispatched(&key, true);
        } else {
            obs::emit_audit_dispatched(&key, false);
        }
        Ok(StatusHandle {
            key,
            observed,
            started: start,
        })
    }
}

/// The work an orchestration instance executes.
#[async_trait]
pub trait AuditActivity: Send + Sync {
    async fn run(&self, input: ValidationPayload) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
struct Instance {
    id: Uuid,
    status: RunStatus,
}

/// In-process orchestration host backed by tokio tasks.
///
/// Suitable for the daemon and for tests; a durable engine can replace it
/// behind the same trait.
pub struct MemoryOrchestrator {
    activity: Arc<dyn AuditActivity>,
    instances: Arc<Mutex<HashMap<String, Instance>>>,
}

impl MemoryOrchestrator {
    pub fn new(activity: Arc<dyn AuditActivity>) -> Self {
        MemoryOrchestrator {
            activity,
            instances: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Instance id of the current run for a key, if any.
    pub fn instance_id(&self, key: &str) -> Option<Uuid> {
        self.instances.lock().unwrap().get(key).map(|i| i.id)
    }

    /// Poll until the instance reaches a terminal status.
    pub async fn wait_for_terminal(&self, key: &str) -> RunStatus {
        loop {
            let status = {
                let instances = self.instances.lock().unwrap();
                instances
                    .get(key)
                    .map(|i| i.status)
                    .unwrap_or(RunStatus::NotStarted)
            };
            if status.is_terminal() {
                return status;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl OrchestrationHost for MemoryOrchestrator {
    async fn status(&self, key: &str) -> Result<RunStatus> {
        let instances = self.instances.lock().unwrap();
        Ok(instances
            .get(key)
            .map(|i| i.status)
            .unwrap_or(RunStatus::NotStarted))
    }

    async fn start_new(&self, key: &str, input: ValidationPayload) -> Result<()> {
        let id = Uuid::new_v4();
        {
            let mut instances = self.instances.lock().unwrap();
            instances.insert(
                key.to_string(),
                Instance {
                    id,
                    status: RunStatus::Running,
                },
            );
        }

        let activity = Arc::clone(&self.activity);
        let instances = Arc::clone(&self.instances);
        let key = key.to_string();
        tokio::spawn(async move {
            let status = match activity.run(input).await {
                Ok(()) => RunStatus::Completed,
                Err(e) => {
                    obs::emit_audit_failed(&key, &e);
                    RunStatus::Failed
                }
            };
            let mut instances = instances.lock().unwrap();
            // Only record the outcome if this run is still the current
            // instance for the key.
            if let Some(instance) = instances.get_mut(&key) {
                if instance.id == id {
                    instance.status = status;
                }
            }
        });
        Ok(())
    }
}

/// Convenience conversion for callers that surface handles as JSON.
impl StatusHandle {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(AuditError::from)
    }
}
