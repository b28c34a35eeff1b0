//! Caller-supplied generation requests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::job::JobKind;

/// Who is asking for a draft.
///
/// Passed explicitly into context assembly; nothing in the crate looks up a
/// "current" tenant or user on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    /// Owning tenant
    pub tenant_id: String,

    /// Requesting user
    pub user_id: String,
}

impl Requester {
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
        }
    }
}

/// A request to draft one artifact from structured facts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationTask {
    /// What to draft
    pub kind: JobKind,

    /// Structured facts chosen by the caller (JSON object)
    #[serde(default)]
    pub facts: Value,

    /// Who is asking
    pub requester: Requester,
}

impl GenerationTask {
    pub fn new(kind: JobKind, facts: Value, requester: Requester) -> Self {
        Self {
            kind,
            facts,
            requester,
        }
    }
}
