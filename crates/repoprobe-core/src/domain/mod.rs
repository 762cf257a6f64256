//! Domain model: error taxonomy, repository snapshot, reports, payloads.

pub mod error;
pub mod payload;
pub mod report;
pub mod repository;

pub use error::{AuditError, Result};
pub use payload::ValidationPayload;
pub use report::{Report, RuleResult, Verdict};
pub use repository::{RepoConfig, Repository, REPO_CONFIG_PATH};
