//! Trigger payload validation.
//!
//! The trigger boundary accepts `{"repository": {"name": ..., "owner":
//! {"login": ...}}}`. Each required field is checked independently and
//! every missing field produces its own message; the aggregate surfaces as
//! [`AuditError::BadRequest`].

use serde::Deserialize;

use crate::domain::error::{AuditError, Result};

/// Validated trigger input for one repository audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPayload {
    pub owner: String,
    pub name: String,
}

impl ValidationPayload {
    /// Orchestration dedup key: `"{owner}_{name}"`.
    pub fn dedup_key(&self) -> String {
        format!("{}_{}", self.owner, self.name)
    }

    /// Parse and validate a raw JSON trigger payload.
    pub fn parse(raw: &str) -> Result<Self> {
        let parsed: RawPayload = serde_json::from_str(raw).map_err(|e| AuditError::BadRequest {
            messages: vec![format!("payload is not valid JSON: {e}")],
        })?;
        Self::from_raw(parsed)
    }

    fn from_raw(raw: RawPayload) -> Result<Self> {
        let mut missing = Vec::new();

        let repository = match raw.repository {
            Some(r) => r,
            None => {
                return Err(AuditError::BadRequest {
                    messages: vec!["repository is required".to_string()],
                });
            }
        };

        let name = match repository.name {
            Some(n) if !n.is_empty() => Some(n),
            _ => {
                missing.push("repository.name is required".to_string());
                None
            }
        };

        let login = match repository.owner {
            Some(owner) => match owner.login {
                Some(l) if !l.is_empty() => Some(l),
                _ => {
                    missing.push("repository.owner.login is required".to_string());
                    None
                }
            },
            None => {
                missing.push("repository.owner is required".to_string());
                None
            }
        };

        if !missing.is_empty() {
            return Err(AuditError::BadRequest { messages: missing });
        }

        Ok(ValidationPayload {
            // Both are Some here; the missing list was empty.
            owner: login.unwrap_or_default(),
            name: name.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawPayload {
    repository: Option<RawRepository>,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    name: Option<String>,
    owner: Option<RawOwner>,
}

#[derive(Debug, Deserialize)]
struct RawOwner {
    login: Option<String>,
}
