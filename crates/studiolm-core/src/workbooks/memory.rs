//! In-memory workbook store

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::traits::{Workbook, WorkbookStore, WorkbookStoreError, WorkbookStoreResult};

#[derive(Debug, Clone, Default)]
struct StoredWorkbook {
    name: String,
    // path -> content, ordered for stable listings
    resources: BTreeMap<String, String>,
}

/// Workbook store holding everything in memory
#[derive(Default)]
pub struct MemoryWorkbookStore {
    workbooks: RwLock<BTreeMap<String, StoredWorkbook>>,
    next_id: AtomicU64,
}

impl MemoryWorkbookStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a workbook with a fixed id (test fixture helper)
    pub fn insert_workbook(&self, id: impl Into<String>, name: impl Into<String>) {
        self.workbooks.write().insert(
            id.into(),
            StoredWorkbook {
                name: name.into(),
                resources: BTreeMap::new(),
            },
        );
    }

    /// Insert a resource directly (test fixture helper)
    pub fn insert_resource(&self, workbook_id: &str, path: impl Into<String>, text: impl Into<String>) {
        if let Some(wb) = self.workbooks.write().get_mut(workbook_id) {
            wb.resources.insert(path.into(), text.into());
        }
    }
}

#[async_trait]
impl WorkbookStore for MemoryWorkbookStore {
    async fn list_workbooks(&self) -> WorkbookStoreResult<Vec<Workbook>> {
        Ok(self
            .workbooks
            .read()
            .iter()
            .map(|(id, wb)| Workbook {
                id: id.clone(),
                name: wb.name.clone(),
                resources: wb.resources.keys().cloned().collect(),
            })
            .collect())
    }

    async fn read_resource(&self, workbook_id: &str, path: &str) -> WorkbookStoreResult<String> {
        let workbooks = self.workbooks.read();
        let wb = workbooks
            .get(workbook_id)
            .ok_or_else(|| WorkbookStoreError::WorkbookNotFound(workbook_id.to_string()))?;
        wb.resources
            .get(path)
            .cloned()
            .ok_or_else(|| WorkbookStoreError::ResourceNotFound {
                workbook_id: workbook_id.to_string(),
                path: path.to_string(),
            })
    }

    async fn write_resource(
        &self,
        workbook_id: &str,
        path: &str,
        text: &str,
    ) -> WorkbookStoreResult<()> {
        let mut workbooks = self.workbooks.write();
        let wb = workbooks
            .get_mut(workbook_id)
            .ok_or_else(|| WorkbookStoreError::WorkbookNotFound(workbook_id.to_string()))?;
        wb.resources.insert(path.to_string(), text.to_string());
        Ok(())
    }

    async fn create_workbook(&self, name: &str) -> WorkbookStoreResult<Workbook> {
        let id = format!("wb-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.workbooks.write().insert(
            id.clone(),
            StoredWorkbook {
                name: name.to_string(),
                resources: BTreeMap::new(),
            },
        );
        Ok(Workbook {
            id,
            name: name.to_string(),
            resources: Vec::new(),
        })
    }
}
