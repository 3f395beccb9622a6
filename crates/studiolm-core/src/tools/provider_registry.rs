//! Tool provider registry: ownership, routing and fail-soft execution
//!
//! Owns every registered provider, routes tool calls to the right one and
//! collapses every failure mode into a structured result. Callers never
//! see an `Err` from `execute_tool`; a broken provider becomes an error
//! string inside the conversation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::logging::Logger;
use crate::types::{ToolCall, ToolErrorCode, ToolExecutionResult};

use super::provider::{ProviderHealth, ToolContext, ToolProvider, ToolProviderError};
use super::registry::ToolRegistry;

/// Options for one tool execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Total attempts (1 = no retry)
    pub max_retries: u32,
    /// Per-attempt timeout
    pub timeout: Duration,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            max_retries: 1,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Errors from provider registration, distinct from tool execution which
/// is always fail-soft
#[derive(Debug, thiserror::Error)]
pub enum ProviderRegistryError {
    #[error("Provider already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Provider not found: {0}")]
    NotFound(String),

    #[error("Provider initialization failed: {0}")]
    InitializationFailed(#[from] ToolProviderError),
}

/// Owns all tool providers and routes execution to them
pub struct ToolProviderRegistry {
    providers: RwLock<Vec<Arc<dyn ToolProvider>>>,
    tool_registry: Arc<ToolRegistry>,
    logger: Arc<dyn Logger>,
}

impl ToolProviderRegistry {
    /// Create a registry routing through the given tool registry
    pub fn new(tool_registry: Arc<ToolRegistry>, logger: Arc<dyn Logger>) -> Self {
        Self {
            providers: RwLock::new(Vec::new()),
            tool_registry,
            logger,
        }
    }

    /// The tool registry this provider registry routes through
    pub fn tool_registry(&self) -> &Arc<ToolRegistry> {
        &self.tool_registry
    }

    /// Register a provider, optionally initializing it, and ingest its
    /// currently-available tools into the tool registry under the
    /// provider's name.
    pub async fn register_provider(
        &self,
        provider: Arc<dyn ToolProvider>,
        auto_initialize: bool,
    ) -> Result<(), ProviderRegistryError> {
        let name = provider.name().to_string();
        if self.find_provider(&name).is_some() {
            return Err(ProviderRegistryError::AlreadyRegistered(name));
        }

        if auto_initialize {
            provider.initialize().await?;
        }

        // A provider that cannot list its tools is still registered; its
        // tools can arrive later via a registry update.
        match provider.available_tools().await {
            Ok(tools) => {
                self.logger.info(&format!(
                    "[ToolProviderRegistry] Registered '{}' with {} tools",
                    name,
                    tools.len()
                ));
                self.tool_registry.register_tools(&name, tools);
            }
            Err(e) => {
                self.logger.warn(&format!(
                    "[ToolProviderRegistry] Registered '{}' but tool listing failed: {}",
                    name, e
                ));
            }
        }

        self.providers.write().push(provider);
        Ok(())
    }

    /// Shut a provider down and remove it and its tools
    pub async fn unregister_provider(&self, name: &str) -> Result<(), ProviderRegistryError> {
        let provider = {
            let mut providers = self.providers.write();
            let index = providers
                .iter()
                .position(|p| p.name() == name)
                .ok_or_else(|| ProviderRegistryError::NotFound(name.to_string()))?;
            providers.remove(index)
        };

        if let Err(e) = provider.shutdown().await {
            self.logger.warn(&format!(
                "[ToolProviderRegistry] Shutdown of '{}' failed: {}",
                name, e
            ));
        }
        self.tool_registry.unregister_tools(name);
        self.logger
            .info(&format!("[ToolProviderRegistry] Unregistered '{}'", name));
        Ok(())
    }

    /// Names of all registered providers
    pub fn provider_names(&self) -> Vec<String> {
        self.providers
            .read()
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    fn find_provider(&self, name: &str) -> Option<Arc<dyn ToolProvider>> {
        self.providers
            .read()
            .iter()
            .find(|p| p.name() == name)
            .cloned()
    }

    /// Two-tier provider resolution.
    ///
    /// Tier 1: the registry's recorded server name for the tool exactly
    /// matches a provider name. Tier 2: the server name is one of a
    /// provider's logical servers (an external provider fronts many
    /// servers under one provider name), so scan providers by descending
    /// priority and take the first that claims the tool.
    fn resolve_provider(&self, tool_name: &str) -> Option<Arc<dyn ToolProvider>> {
        if let Some(server_name) = self.tool_registry.tool_server(tool_name) {
            if let Some(provider) = self.find_provider(&server_name) {
                return Some(provider);
            }
        }

        let mut candidates: Vec<Arc<dyn ToolProvider>> = self.providers.read().clone();
        candidates.sort_by_key(|p| std::cmp::Reverse(p.priority()));
        candidates.into_iter().find(|p| p.can_execute(tool_name))
    }

    /// Execute one tool call. Never returns an error: every failure mode
    /// is folded into a `ToolExecutionResult`.
    pub async fn execute_tool(
        &self,
        call: &ToolCall,
        context: &ToolContext,
        options: &ExecuteOptions,
    ) -> ToolExecutionResult {
        use crate::types::ExecutionTimer;

        let timer = ExecutionTimer::start();

        let Some(provider) = self.resolve_provider(&call.name) else {
            self.logger.warn(&format!(
                "[ToolProviderRegistry] No provider for tool '{}'",
                call.name
            ));
            return timer.failure(
                "none",
                ToolErrorCode::NoProvider,
                format!("no provider can execute tool '{}'", call.name),
                0,
            );
        };

        let provider_name = provider.name().to_string();
        let max_attempts = options.max_retries.max(1);
        let mut last_error: Option<ToolProviderError> = None;
        let mut retries_used = 0;

        for attempt in 0..max_attempts {
            retries_used = attempt;
            if attempt > 0 {
                // short increasing backoff between attempts
                let backoff = Duration::from_millis(100 * attempt as u64);
                tokio::time::sleep(backoff).await;
                self.logger.debug(&format!(
                    "[ToolProviderRegistry] Retry {} for tool '{}'",
                    attempt, call.name
                ));
            }

            match tokio::time::timeout(
                options.timeout,
                provider.execute_tool(call, context, options.timeout),
            )
            .await
            {
                Ok(Ok(output)) => {
                    return timer.success(provider_name, output, attempt);
                }
                Ok(Err(e)) => {
                    let retryable = e.retryable();
                    self.logger.warn(&format!(
                        "[ToolProviderRegistry] Tool '{}' failed on '{}' (attempt {}): {}",
                        call.name,
                        provider_name,
                        attempt + 1,
                        e
                    ));
                    last_error = Some(e);
                    if !retryable {
                        break;
                    }
                }
                Err(_) => {
                    self.logger.warn(&format!(
                        "[ToolProviderRegistry] Tool '{}' timed out after {:?} on '{}'",
                        call.name, options.timeout, provider_name
                    ));
                    return timer.failure(
                        provider_name,
                        ToolErrorCode::Timeout,
                        format!("tool '{}' timed out after {:?}", call.name, options.timeout),
                        attempt,
                    );
                }
            }
        }

        let (code, message) = match last_error {
            Some(ToolProviderError::ServerUnavailable(server)) => (
                ToolErrorCode::ProviderUnavailable,
                format!("server '{}' is not running", server),
            ),
            Some(e) => (ToolErrorCode::ExecutionFailed, e.to_string()),
            None => (
                ToolErrorCode::ExecutionFailed,
                "tool execution failed".to_string(),
            ),
        };
        timer.failure(provider_name, code, message, retries_used)
    }

    /// Poll every provider's health. A failing health check is reported
    /// as `Unknown` rather than propagated.
    pub async fn all_provider_health(&self) -> HashMap<String, ProviderHealth> {
        let providers: Vec<Arc<dyn ToolProvider>> = self.providers.read().clone();
        let mut health = HashMap::new();
        for provider in providers {
            let status = match provider.get_health().await {
                Ok(h) => h,
                Err(e) => ProviderHealth::unknown(e.to_string()),
            };
            health.insert(provider.name().to_string(), status);
        }
        health
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::logging::NoOpLogger;
    use crate::tools::provider::ProviderLifecycle;
    use crate::types::ToolDefinition;

    struct StubProvider {
        name: String,
        priority: i32,
        tools: Vec<String>,
        calls: AtomicU32,
        fail_first: bool,
        sleep: Option<Duration>,
        health: Result<ProviderHealth, ()>,
    }

    impl StubProvider {
        fn new(name: &str, tools: &[&str]) -> Self {
            Self {
                name: name.to_string(),
                priority: 0,
                tools: tools.iter().map(|s| s.to_string()).collect(),
                calls: AtomicU32::new(0),
                fail_first: false,
                sleep: None,
                health: Ok(ProviderHealth::healthy()),
            }
        }

        fn with_priority(mut self, priority: i32) -> Self {
            self.priority = priority;
            self
        }

        fn failing_once(mut self) -> Self {
            self.fail_first = true;
            self
        }

        fn slow(mut self, sleep: Duration) -> Self {
            self.sleep = Some(sleep);
            self
        }

        fn broken_health(mut self) -> Self {
            self.health = Err(());
            self
        }
    }

    #[async_trait]
    impl ToolProvider for StubProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn capabilities(&self) -> Vec<String> {
            vec!["test".to_string()]
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn lifecycle(&self) -> ProviderLifecycle {
            ProviderLifecycle::Initialized
        }

        async fn initialize(&self) -> Result<(), ToolProviderError> {
            Ok(())
        }

        async fn shutdown(&self) -> Result<(), ToolProviderError> {
            Ok(())
        }

        fn can_execute(&self, tool_name: &str) -> bool {
            self.tools.iter().any(|t| t == tool_name)
        }

        async fn execute_tool(
            &self,
            call: &ToolCall,
            _context: &ToolContext,
            _timeout: Duration,
        ) -> Result<String, ToolProviderError> {
            if let Some(sleep) = self.sleep {
                tokio::time::sleep(sleep).await;
            }
            let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && attempt == 0 {
                return Err(ToolProviderError::failed_retryable("transient failure"));
            }
            Ok(format!("{} handled {}", self.name, call.name))
        }

        async fn get_health(&self) -> Result<ProviderHealth, ToolProviderError> {
            match &self.health {
                Ok(h) => Ok(h.clone()),
                Err(_) => Err(ToolProviderError::failed("health probe crashed")),
            }
        }

        async fn available_tools(&self) -> Result<Vec<ToolDefinition>, ToolProviderError> {
            Ok(self
                .tools
                .iter()
                .map(|t| ToolDefinition::new(t.clone(), ""))
                .collect())
        }
    }

    fn fixture() -> ToolProviderRegistry {
        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger::new());
        let tool_registry = Arc::new(ToolRegistry::new(logger.clone()));
        ToolProviderRegistry::new(tool_registry, logger)
    }

    fn call(name: &str) -> ToolCall {
        ToolCall::new("call_1", name, json!({}))
    }

    #[tokio::test]
    async fn test_unknown_tool_is_no_provider() {
        let registry = fixture();
        let result = registry
            .execute_tool(&call("missing"), &ToolContext::unscoped(), &ExecuteOptions::default())
            .await;
        assert!(!result.success);
        assert_eq!(result.error_code, Some(ToolErrorCode::NoProvider));
    }

    #[tokio::test]
    async fn test_fast_path_routes_by_server_name() {
        let registry = fixture();
        registry
            .register_provider(Arc::new(StubProvider::new("builtin", &["echo"])), true)
            .await
            .unwrap();

        let result = registry
            .execute_tool(&call("echo"), &ToolContext::unscoped(), &ExecuteOptions::default())
            .await;
        assert!(result.success);
        assert_eq!(result.provider_name, "builtin");
        assert_eq!(result.output.as_deref(), Some("builtin handled echo"));
    }

    #[tokio::test]
    async fn test_fallback_scans_by_priority() {
        let registry = fixture();
        // tools registered under a *server* name no provider carries
        registry
            .tool_registry()
            .register_tools("workbook-rag", vec![ToolDefinition::new("search", "")]);

        registry
            .register_provider(
                Arc::new(StubProvider::new("low", &["search"]).with_priority(1)),
                true,
            )
            .await
            .unwrap();
        registry
            .register_provider(
                Arc::new(StubProvider::new("high", &["search"]).with_priority(10)),
                true,
            )
            .await
            .unwrap();

        let result = registry
            .execute_tool(&call("search"), &ToolContext::unscoped(), &ExecuteOptions::default())
            .await;
        assert!(result.success);
        assert_eq!(result.provider_name, "high");
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failure() {
        let registry = fixture();
        registry
            .register_provider(
                Arc::new(StubProvider::new("flaky", &["echo"]).failing_once()),
                true,
            )
            .await
            .unwrap();

        let options = ExecuteOptions {
            max_retries: 2,
            ..Default::default()
        };
        let result = registry
            .execute_tool(&call("echo"), &ToolContext::unscoped(), &options)
            .await;
        assert!(result.success);
        assert_eq!(result.retry_count, 1);
    }

    #[tokio::test]
    async fn test_no_retry_by_default() {
        let registry = fixture();
        registry
            .register_provider(
                Arc::new(StubProvider::new("flaky", &["echo"]).failing_once()),
                true,
            )
            .await
            .unwrap();

        let result = registry
            .execute_tool(&call("echo"), &ToolContext::unscoped(), &ExecuteOptions::default())
            .await;
        assert!(!result.success);
        assert_eq!(result.error_code, Some(ToolErrorCode::ExecutionFailed));
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let registry = fixture();
        registry
            .register_provider(
                Arc::new(
                    StubProvider::new("slow", &["echo"]).slow(Duration::from_millis(200)),
                ),
                true,
            )
            .await
            .unwrap();

        let options = ExecuteOptions {
            max_retries: 1,
            timeout: Duration::from_millis(20),
        };
        let result = registry
            .execute_tool(&call("echo"), &ToolContext::unscoped(), &options)
            .await;
        assert!(!result.success);
        assert_eq!(result.error_code, Some(ToolErrorCode::Timeout));
    }

    struct DownProvider;

    #[async_trait]
    impl ToolProvider for DownProvider {
        fn name(&self) -> &str {
            "down"
        }

        fn capabilities(&self) -> Vec<String> {
            vec!["test".to_string()]
        }

        fn lifecycle(&self) -> ProviderLifecycle {
            ProviderLifecycle::Initialized
        }

        async fn initialize(&self) -> Result<(), ToolProviderError> {
            Ok(())
        }

        async fn shutdown(&self) -> Result<(), ToolProviderError> {
            Ok(())
        }

        fn can_execute(&self, tool_name: &str) -> bool {
            tool_name == "search"
        }

        async fn execute_tool(
            &self,
            _call: &ToolCall,
            _context: &ToolContext,
            _timeout: Duration,
        ) -> Result<String, ToolProviderError> {
            Err(ToolProviderError::ServerUnavailable("workbook-rag".to_string()))
        }

        async fn get_health(&self) -> Result<ProviderHealth, ToolProviderError> {
            Ok(ProviderHealth::unhealthy("down"))
        }

        async fn available_tools(&self) -> Result<Vec<ToolDefinition>, ToolProviderError> {
            Ok(vec![ToolDefinition::new("search", "")])
        }
    }

    #[tokio::test]
    async fn test_unavailable_server_is_provider_unavailable() {
        let registry = fixture();
        registry
            .register_provider(Arc::new(DownProvider), true)
            .await
            .unwrap();

        let result = registry
            .execute_tool(&call("search"), &ToolContext::unscoped(), &ExecuteOptions::default())
            .await;
        assert!(!result.success);
        assert_eq!(result.error_code, Some(ToolErrorCode::ProviderUnavailable));
        assert!(result.error.unwrap().contains("workbook-rag"));
        assert_eq!(result.retry_count, 0);
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let registry = fixture();
        registry
            .register_provider(Arc::new(StubProvider::new("dup", &["a"])), false)
            .await
            .unwrap();
        let err = registry
            .register_provider(Arc::new(StubProvider::new("dup", &["b"])), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderRegistryError::AlreadyRegistered(_)));
    }

    #[tokio::test]
    async fn test_unregister_removes_tools() {
        let registry = fixture();
        registry
            .register_provider(Arc::new(StubProvider::new("builtin", &["echo"])), true)
            .await
            .unwrap();
        assert_eq!(registry.tool_registry().tool_count(), 1);

        registry.unregister_provider("builtin").await.unwrap();
        assert_eq!(registry.tool_registry().tool_count(), 0);
        assert!(registry.provider_names().is_empty());
    }

    #[tokio::test]
    async fn test_broken_health_check_reports_unknown() {
        let registry = fixture();
        registry
            .register_provider(Arc::new(StubProvider::new("ok", &["a"])), true)
            .await
            .unwrap();
        registry
            .register_provider(
                Arc::new(StubProvider::new("broken", &["b"]).broken_health()),
                true,
            )
            .await
            .unwrap();

        let health = registry.all_provider_health().await;
        assert_eq!(health["ok"].status, crate::tools::provider::HealthStatus::Healthy);
        assert_eq!(
            health["broken"].status,
            crate::tools::provider::HealthStatus::Unknown
        );
    }
}
