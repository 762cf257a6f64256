//! Domain-level error taxonomy for repoprobe.

/// Errors produced by audit operations.
///
/// The taxonomy mirrors how failures are handled:
/// - `BadRequest` — trigger payload failed schema validation; surfaced to
///   the trigger boundary, never retried.
/// - `NotFound` — a remote object is absent. Content and config lookups
///   translate this into an empty/false domain result; core object fetches
///   (e.g. the repository snapshot itself) propagate it.
/// - `Remote` — transport or 5xx failure from the hosting API. Propagated
///   as-is; retry policy belongs to the transport collaborator.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("bad request: {}", messages.join("; "))]
    BadRequest { messages: Vec<String> },

    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("remote failure (status {status}): {message}")]
    Remote { status: u16, message: String },

    #[error("rule {rule} failed: {message}")]
    Rule { rule: String, message: String },

    #[error("orchestration error: {0}")]
    Orchestration(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AuditError {
    /// Shorthand for a `NotFound` error naming the missing object.
    pub fn not_found(what: impl Into<String>) -> Self {
        AuditError::NotFound { what: what.into() }
    }

    /// Whether this error is a remote-object-absent condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AuditError::NotFound { .. })
    }
}

/// Result type for audit operations.
pub type Result<T> = std::result::Result<T, AuditError>;
