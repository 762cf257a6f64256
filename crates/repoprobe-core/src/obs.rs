//! Structured observability events for the audit lifecycle.
//!
//! Events are emitted at `info!` (failures at `warn!`) and follow the
//! `event = "audit.*"` naming scheme so log pipelines can filter on them.

use tracing::{info, warn};

/// Emit event: a trigger was dispatched; `started` tells whether a new
/// orchestration instance was created.
pub fn emit_audit_dispatched(key: &str, started: bool) {
    info!(event = "audit.dispatched", key = %key, started = started);
}

/// Emit event: an audit run started for a repository.
pub fn emit_audit_started(key: &str) {
    info!(event = "audit.started", key = %key);
}

/// Emit event: an audit run finished.
pub fn emit_audit_finished(key: &str, rules: usize, invalid: usize, fix_failures: usize) {
    info!(
        event = "audit.finished",
        key = %key,
        rules = rules,
        invalid = invalid,
        fix_failures = fix_failures,
    );
}

/// Emit event: an audit run failed before producing a report.
pub fn emit_audit_failed(key: &str, error: &dyn std::fmt::Display) {
    warn!(event = "audit.failed", key = %key, error = %error);
}

/// Emit event: an automated fix was applied for a rule.
pub fn emit_fix_applied(key: &str, rule: &str) {
    info!(event = "audit.fix_applied", key = %key, rule = %rule);
}

/// Emit event: an automated fix failed; the run continues with the
/// remaining fixes.
pub fn emit_fix_failed(key: &str, rule: &str, error: &dyn std::fmt::Display) {
    warn!(event = "audit.fix_failed", key = %key, rule = %rule, error = %error);
}
