//! Built-in workbook tools
//!
//! Executes a fixed catalog of tools directly against the workbook store,
//! without any external channel. Every tool filters what it can see by
//! the active context scope; results are human-readable strings so they
//! compose uniformly with externally-sourced tool results.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::json;

use crate::logging::Logger;
use crate::types::{ToolCall, ToolDefinition};
use crate::workbooks::{Workbook, WorkbookStore, WorkbookStoreError};

use super::provider::{
    ProviderHealth, ProviderLifecycle, ToolContext, ToolProvider, ToolProviderError,
};

/// Provider name; also the server name its tools are registered under
pub const BUILTIN_PROVIDER_NAME: &str = "builtin";

/// Document extensions that mark a "workbook name" as actually being a
/// file path
const DOCUMENT_EXTENSIONS: &[&str] = &[".pdf", ".docx", ".xlsx", ".csv", ".md", ".txt"];

static CATALOG: Lazy<Vec<ToolDefinition>> = Lazy::new(|| {
    vec![
        ToolDefinition::new(
            "list_workbooks",
            "List the workbooks visible in the current context, with their document counts",
        )
        .with_schema(json!({
            "type": "object",
            "properties": {}
        })),
        ToolDefinition::new(
            "list_documents",
            "List the documents inside one workbook",
        )
        .with_schema(json!({
            "type": "object",
            "properties": {
                "workbook_id": { "type": "string", "description": "Id of the workbook" }
            },
            "required": ["workbook_id"]
        })),
        ToolDefinition::new("read_document", "Read the text content of a document")
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "workbook_id": { "type": "string", "description": "Id of the workbook" },
                    "path": { "type": "string", "description": "Document path inside the workbook" }
                },
                "required": ["workbook_id", "path"]
            })),
        ToolDefinition::new(
            "write_document",
            "Create or replace a document inside a workbook",
        )
        .with_schema(json!({
            "type": "object",
            "properties": {
                "workbook_id": { "type": "string", "description": "Id of the workbook" },
                "path": { "type": "string", "description": "Document path inside the workbook" },
                "content": { "type": "string", "description": "Full text content to write" }
            },
            "required": ["workbook_id", "path", "content"]
        })),
        ToolDefinition::new(
            "create_workbook",
            "Create a new, empty workbook with the given display name",
        )
        .with_schema(json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Display name for the new workbook" }
            },
            "required": ["name"]
        })),
        ToolDefinition::new(
            "search_documents",
            "Search document contents for a phrase across the visible workbooks",
        )
        .with_schema(json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Text to search for" },
                "workbook_id": {
                    "type": "string",
                    "description": "Restrict the search to one workbook"
                }
            },
            "required": ["query"]
        })),
    ]
});

/// Internal tool provider executing the built-in workbook catalog
pub struct BuiltinToolProvider {
    store: Arc<dyn WorkbookStore>,
    lifecycle: RwLock<ProviderLifecycle>,
    logger: Arc<dyn Logger>,
}

impl BuiltinToolProvider {
    /// Create a provider over the given workbook store
    pub fn new(store: Arc<dyn WorkbookStore>, logger: Arc<dyn Logger>) -> Self {
        Self {
            store,
            lifecycle: RwLock::new(ProviderLifecycle::Uninitialized),
            logger,
        }
    }

    /// The workbooks visible under `context`, in listing order
    async fn visible_workbooks(
        &self,
        context: &ToolContext,
    ) -> Result<Vec<Workbook>, ToolProviderError> {
        let workbooks = self
            .store
            .list_workbooks()
            .await
            .map_err(|e| ToolProviderError::failed(e.to_string()))?;
        Ok(workbooks
            .into_iter()
            .filter(|wb| context.scope.allows(&wb.id))
            .collect())
    }

    fn require_visible(
        &self,
        context: &ToolContext,
        workbook_id: &str,
    ) -> Result<(), ToolProviderError> {
        if context.scope.allows(workbook_id) {
            Ok(())
        } else {
            Err(ToolProviderError::failed(format!(
                "workbook '{}' is not part of the active context",
                workbook_id
            )))
        }
    }

    fn require_str<'a>(call: &'a ToolCall, key: &str) -> Result<&'a str, ToolProviderError> {
        call.arg_str(key).ok_or_else(|| {
            ToolProviderError::failed(format!(
                "tool '{}' requires a string argument '{}'",
                call.name, key
            ))
        })
    }

    async fn list_workbooks(&self, context: &ToolContext) -> Result<String, ToolProviderError> {
        let workbooks = self.visible_workbooks(context).await?;
        if workbooks.is_empty() {
            return Ok("No workbooks are visible in the current context.".to_string());
        }
        let lines: Vec<String> = workbooks
            .iter()
            .map(|wb| format!("- {} ({}): {} documents", wb.id, wb.name, wb.resources.len()))
            .collect();
        Ok(format!("Workbooks:\n{}", lines.join("\n")))
    }

    async fn list_documents(
        &self,
        call: &ToolCall,
        context: &ToolContext,
    ) -> Result<String, ToolProviderError> {
        let workbook_id = Self::require_str(call, "workbook_id")?;
        self.require_visible(context, workbook_id)?;

        let workbooks = self.visible_workbooks(context).await?;
        let Some(wb) = workbooks.iter().find(|wb| wb.id == workbook_id) else {
            return Err(ToolProviderError::failed(format!(
                "workbook '{}' does not exist",
                workbook_id
            )));
        };
        if wb.resources.is_empty() {
            return Ok(format!("Workbook {} ({}) has no documents.", wb.id, wb.name));
        }
        let lines: Vec<String> = wb.resources.iter().map(|p| format!("- {}", p)).collect();
        Ok(format!(
            "Documents in {} ({}):\n{}",
            wb.id,
            wb.name,
            lines.join("\n")
        ))
    }

    async fn read_document(
        &self,
        call: &ToolCall,
        context: &ToolContext,
    ) -> Result<String, ToolProviderError> {
        let workbook_id = Self::require_str(call, "workbook_id")?;
        let path = Self::require_str(call, "path")?;
        self.require_visible(context, workbook_id)?;

        match self.store.read_resource(workbook_id, path).await {
            Ok(text) => {
                context.record_read(&format!("workbook://{}/{}", workbook_id, path));
                Ok(text)
            }
            Err(WorkbookStoreError::ResourceNotFound { .. }) => Err(ToolProviderError::failed(
                format!("document '{}' does not exist in workbook '{}'", path, workbook_id),
            )),
            Err(e) => Err(ToolProviderError::failed(e.to_string())),
        }
    }

    async fn write_document(
        &self,
        call: &ToolCall,
        context: &ToolContext,
    ) -> Result<String, ToolProviderError> {
        let workbook_id = Self::require_str(call, "workbook_id")?;
        let path = Self::require_str(call, "path")?;
        let content = Self::require_str(call, "content")?;
        self.require_visible(context, workbook_id)?;

        self.store
            .write_resource(workbook_id, path, content)
            .await
            .map_err(|e| ToolProviderError::failed(e.to_string()))?;
        Ok(format!(
            "Wrote {} characters to workbook://{}/{}",
            content.len(),
            workbook_id,
            path
        ))
    }

    async fn create_workbook(&self, call: &ToolCall) -> Result<String, ToolProviderError> {
        let name = Self::require_str(call, "name")?;

        // Models sometimes confuse this tool with write_document and pass
        // a file path; catch that before creating a malformed workbook.
        if let Err(reason) = validate_workbook_name(name) {
            return Ok(format!(
                "Cannot create workbook: {}. Pass a plain display name like \"Flight Tests\"; \
                 to add a document to an existing workbook use write_document instead.",
                reason
            ));
        }

        let wb = self
            .store
            .create_workbook(name)
            .await
            .map_err(|e| ToolProviderError::failed(e.to_string()))?;
        Ok(format!("Created workbook {} ({})", wb.id, wb.name))
    }

    async fn search_documents(
        &self,
        call: &ToolCall,
        context: &ToolContext,
    ) -> Result<String, ToolProviderError> {
        let query = Self::require_str(call, "query")?;
        let only = call.arg_str("workbook_id");
        if let Some(workbook_id) = only {
            self.require_visible(context, workbook_id)?;
        }

        let needle = query.to_lowercase();
        let mut matches: Vec<String> = Vec::new();
        for wb in self.visible_workbooks(context).await? {
            if only.map(|id| id != wb.id).unwrap_or(false) {
                continue;
            }
            for path in &wb.resources {
                let Ok(text) = self.store.read_resource(&wb.id, path).await else {
                    continue;
                };
                for line in text.lines() {
                    if line.to_lowercase().contains(&needle) {
                        context.record_read(&format!("workbook://{}/{}", wb.id, path));
                        matches.push(format!("workbook://{}/{}: {}", wb.id, path, line.trim()));
                    }
                }
            }
        }

        if matches.is_empty() {
            Ok(format!("No matches for \"{}\".", query))
        } else {
            Ok(format!(
                "Matches for \"{}\":\n{}",
                query,
                matches.join("\n")
            ))
        }
    }
}

/// Reject workbook names that are really file paths.
fn validate_workbook_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("the name is empty".to_string());
    }
    if trimmed.contains('/') || trimmed.contains('\\') {
        return Err(format!("\"{}\" contains a path separator", trimmed));
    }
    if trimmed.contains("://") {
        return Err(format!("\"{}\" looks like a URI", trimmed));
    }
    let lower = trimmed.to_lowercase();
    if let Some(ext) = DOCUMENT_EXTENSIONS.iter().find(|ext| lower.ends_with(*ext)) {
        return Err(format!("\"{}\" ends with the document extension {}", trimmed, ext));
    }
    Ok(())
}

#[async_trait]
impl ToolProvider for BuiltinToolProvider {
    fn name(&self) -> &str {
        BUILTIN_PROVIDER_NAME
    }

    fn capabilities(&self) -> Vec<String> {
        vec!["workbooks".to_string()]
    }

    fn priority(&self) -> i32 {
        // built-ins win the fallback scan over external providers
        100
    }

    fn lifecycle(&self) -> ProviderLifecycle {
        *self.lifecycle.read()
    }

    async fn initialize(&self) -> Result<(), ToolProviderError> {
        *self.lifecycle.write() = ProviderLifecycle::Initialized;
        self.logger.debug("[BuiltinToolProvider] Initialized");
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ToolProviderError> {
        *self.lifecycle.write() = ProviderLifecycle::Shutdown;
        Ok(())
    }

    fn can_execute(&self, tool_name: &str) -> bool {
        CATALOG.iter().any(|t| t.name == tool_name)
    }

    async fn execute_tool(
        &self,
        call: &ToolCall,
        context: &ToolContext,
        _timeout: Duration,
    ) -> Result<String, ToolProviderError> {
        if *self.lifecycle.read() != ProviderLifecycle::Initialized {
            return Err(ToolProviderError::NotInitialized);
        }

        match call.name.as_str() {
            "list_workbooks" => self.list_workbooks(context).await,
            "list_documents" => self.list_documents(call, context).await,
            "read_document" => self.read_document(call, context).await,
            "write_document" => self.write_document(call, context).await,
            "create_workbook" => self.create_workbook(call).await,
            "search_documents" => self.search_documents(call, context).await,
            other => Err(ToolProviderError::UnknownTool(other.to_string())),
        }
    }

    async fn get_health(&self) -> Result<ProviderHealth, ToolProviderError> {
        match self.store.list_workbooks().await {
            Ok(_) => Ok(ProviderHealth::healthy()),
            Err(e) => Ok(ProviderHealth::unhealthy(format!(
                "workbook store unreachable: {}",
                e
            ))),
        }
    }

    async fn available_tools(&self) -> Result<Vec<ToolDefinition>, ToolProviderError> {
        Ok(CATALOG.clone())
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::logging::NoOpLogger;
    use crate::tools::provider::ResourceTracker;
    use crate::types::ContextScope;
    use crate::workbooks::MemoryWorkbookStore;

    struct RecordingTracker {
        reads: Mutex<Vec<String>>,
    }

    impl ResourceTracker for RecordingTracker {
        fn record_read(&self, uri: &str) {
            self.reads.lock().push(uri.to_string());
        }
    }

    fn fixture() -> (BuiltinToolProvider, Arc<MemoryWorkbookStore>) {
        let store = Arc::new(MemoryWorkbookStore::new());
        store.insert_workbook("wbA", "Alpha");
        store.insert_workbook("wbB", "Beta");
        store.insert_resource("wbA", "notes.md", "main gear inspection due");
        store.insert_resource("wbB", "log.md", "hydraulics nominal");
        let provider = BuiltinToolProvider::new(store.clone(), Arc::new(NoOpLogger::new()));
        (provider, store)
    }

    fn scoped_to(ids: &[&str]) -> ToolContext {
        ToolContext::new(ContextScope::scoped(
            "ctx-1",
            ids.iter().map(|s| s.to_string()),
        ))
    }

    async fn run(
        provider: &BuiltinToolProvider,
        context: &ToolContext,
        name: &str,
        args: serde_json::Value,
    ) -> Result<String, ToolProviderError> {
        provider.initialize().await.unwrap();
        provider
            .execute_tool(
                &ToolCall::new("call_1", name, args),
                context,
                Duration::from_secs(5),
            )
            .await
    }

    #[tokio::test]
    async fn test_list_workbooks_respects_scope() {
        let (provider, _) = fixture();
        let out = run(&provider, &scoped_to(&["wbA"]), "list_workbooks", json!({}))
            .await
            .unwrap();
        assert!(out.contains("wbA"));
        assert!(!out.contains("wbB"));
    }

    #[tokio::test]
    async fn test_list_workbooks_unscoped_sees_all() {
        let (provider, _) = fixture();
        let out = run(&provider, &ToolContext::unscoped(), "list_workbooks", json!({}))
            .await
            .unwrap();
        assert!(out.contains("wbA"));
        assert!(out.contains("wbB"));
    }

    #[tokio::test]
    async fn test_read_document_records_read() {
        let (provider, _) = fixture();
        let tracker = Arc::new(RecordingTracker {
            reads: Mutex::new(Vec::new()),
        });
        let context = ToolContext::unscoped().with_tracker(tracker.clone());

        let out = run(
            &provider,
            &context,
            "read_document",
            json!({"workbook_id": "wbA", "path": "notes.md"}),
        )
        .await
        .unwrap();
        assert_eq!(out, "main gear inspection due");
        assert_eq!(
            tracker.reads.lock().as_slice(),
            &["workbook://wbA/notes.md".to_string()]
        );
    }

    #[tokio::test]
    async fn test_read_out_of_scope_is_rejected() {
        let (provider, _) = fixture();
        let err = run(
            &provider,
            &scoped_to(&["wbA"]),
            "read_document",
            json!({"workbook_id": "wbB", "path": "log.md"}),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("not part of the active context"));
    }

    #[tokio::test]
    async fn test_create_workbook_guardrail() {
        let (provider, store) = fixture();
        for bad in ["report.pdf", "a/b", "workbook://x", "notes\\draft.md"] {
            let out = run(&provider, &ToolContext::unscoped(), "create_workbook", json!({"name": bad}))
                .await
                .unwrap();
            assert!(
                out.starts_with("Cannot create workbook"),
                "expected rejection for {:?}, got {:?}",
                bad,
                out
            );
        }
        // nothing was created
        assert_eq!(store.list_workbooks().await.unwrap().len(), 2);

        let out = run(
            &provider,
            &ToolContext::unscoped(),
            "create_workbook",
            json!({"name": "Flight Tests"}),
        )
        .await
        .unwrap();
        assert!(out.starts_with("Created workbook"));
        assert_eq!(store.list_workbooks().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_search_documents_scoped() {
        let (provider, _) = fixture();
        let out = run(
            &provider,
            &scoped_to(&["wbB"]),
            "search_documents",
            json!({"query": "nominal"}),
        )
        .await
        .unwrap();
        assert!(out.contains("workbook://wbB/log.md"));

        let out = run(
            &provider,
            &scoped_to(&["wbA"]),
            "search_documents",
            json!({"query": "nominal"}),
        )
        .await
        .unwrap();
        assert!(out.contains("No matches"));
    }

    #[tokio::test]
    async fn test_uninitialized_provider_refuses() {
        let (provider, _) = fixture();
        let err = provider
            .execute_tool(
                &ToolCall::new("c", "list_workbooks", json!({})),
                &ToolContext::unscoped(),
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolProviderError::NotInitialized));
    }

    #[test]
    fn test_validate_workbook_name() {
        assert!(validate_workbook_name("Flight Tests").is_ok());
        assert!(validate_workbook_name("report.pdf").is_err());
        assert!(validate_workbook_name("a/b").is_err());
        assert!(validate_workbook_name("workbook://x").is_err());
        assert!(validate_workbook_name("  ").is_err());
    }
}
