//! Workbook store trait definition

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A workbook: a named container of document resources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workbook {
    /// Stable identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Relative paths of the resources it contains
    pub resources: Vec<String>,
}

/// Errors from the workbook store
#[derive(Error, Debug)]
pub enum WorkbookStoreError {
    #[error("Workbook not found: {0}")]
    WorkbookNotFound(String),

    #[error("Resource not found: {workbook_id}/{path}")]
    ResourceNotFound { workbook_id: String, path: String },

    #[error("Store error: {0}")]
    Other(String),
}

pub type WorkbookStoreResult<T> = Result<T, WorkbookStoreError>;

/// Access to the application's workbooks and their documents
#[async_trait]
pub trait WorkbookStore: Send + Sync {
    /// List all workbooks with their resource paths
    async fn list_workbooks(&self) -> WorkbookStoreResult<Vec<Workbook>>;

    /// Read a resource's text content
    async fn read_resource(&self, workbook_id: &str, path: &str) -> WorkbookStoreResult<String>;

    /// Write (create or replace) a resource's text content
    async fn write_resource(
        &self,
        workbook_id: &str,
        path: &str,
        text: &str,
    ) -> WorkbookStoreResult<()>;

    /// Create a new, empty workbook with the given display name
    async fn create_workbook(&self, name: &str) -> WorkbookStoreResult<Workbook>;
}
