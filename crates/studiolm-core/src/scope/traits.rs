//! Scoping collaborator trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The active scope as reported by the scoping collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveScope {
    /// Identifier of the active context
    #[serde(rename = "scopeId")]
    pub scope_id: String,
    /// Workbook ids visible under this context
    #[serde(rename = "allowedIds")]
    pub allowed_ids: Vec<String>,
}

/// Errors from the scoping collaborator
#[derive(Error, Debug)]
pub enum ScopeServiceError {
    #[error("Scope service unavailable: {0}")]
    Unavailable(String),

    #[error("Scope service error: {0}")]
    Other(String),
}

/// External collaborator that knows the active context
#[async_trait]
pub trait ScopeService: Send + Sync {
    /// The currently active scope, or `None` when no context is selected
    async fn active_scope(&self) -> Result<Option<ActiveScope>, ScopeServiceError>;
}
