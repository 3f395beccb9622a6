//! Context scope: request-level visibility over workbooks

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// The visibility scope active for one chat request.
///
/// `allowed_ids = None` means unscoped: every workbook is visible. A scope
/// is resolved lazily once per request and discarded at request end; it is
/// never persisted or shared between requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextScope {
    /// Identifier of the active context, if any
    #[serde(rename = "contextId")]
    pub context_id: Option<String>,
    /// Workbook ids visible under this scope; `None` = all visible
    #[serde(rename = "allowedIds")]
    pub allowed_ids: Option<HashSet<String>>,
}

impl ContextScope {
    /// A scope that allows everything
    pub fn unscoped() -> Self {
        Self {
            context_id: None,
            allowed_ids: None,
        }
    }

    /// A scope restricted to the given workbook ids
    pub fn scoped(
        context_id: impl Into<String>,
        allowed_ids: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            context_id: Some(context_id.into()),
            allowed_ids: Some(allowed_ids.into_iter().collect()),
        }
    }

    /// Whether this scope restricts visibility at all
    pub fn is_unscoped(&self) -> bool {
        self.allowed_ids.is_none()
    }

    /// Whether the given workbook id is visible under this scope
    pub fn allows(&self, workbook_id: &str) -> bool {
        match &self.allowed_ids {
            None => true,
            Some(ids) => ids.contains(workbook_id),
        }
    }
}

impl Default for ContextScope {
    fn default() -> Self {
        Self::unscoped()
    }
}
