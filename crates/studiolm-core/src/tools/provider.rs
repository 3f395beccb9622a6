//! Tool provider abstraction

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ContextScope, ToolCall, ToolDefinition};

/// Provider lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderLifecycle {
    Uninitialized,
    Initialized,
    Shutdown,
}

/// Provider health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    /// The health check itself failed
    Unknown,
}

/// Result of a provider health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProviderHealth {
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            detail: None,
        }
    }

    pub fn degraded(detail: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            detail: Some(detail.into()),
        }
    }

    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            detail: Some(detail.into()),
        }
    }

    pub fn unknown(detail: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unknown,
            detail: Some(detail.into()),
        }
    }
}

/// Errors a provider can produce
#[derive(Error, Debug)]
pub enum ToolProviderError {
    #[error("Provider not initialized")]
    NotInitialized,

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Server not running: {0}")]
    ServerUnavailable(String),

    #[error("{message}")]
    ExecutionFailed { message: String, retryable: bool },
}

impl ToolProviderError {
    /// Create a non-retryable execution failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            message: message.into(),
            retryable: false,
        }
    }

    /// Create a retryable execution failure
    pub fn failed_retryable(message: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            message: message.into(),
            retryable: true,
        }
    }

    /// Whether retrying the call might succeed
    pub fn retryable(&self) -> bool {
        match self {
            ToolProviderError::ServerUnavailable(_) => true,
            ToolProviderError::ExecutionFailed { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

/// Sink for resource reads, so the orchestrator can build citations
/// without tool authors knowing about citations.
pub trait ResourceTracker: Send + Sync {
    /// Record that a resource identified by `uri` was read
    fn record_read(&self, uri: &str);
}

/// Request-scoped state passed through tool execution.
#[derive(Clone)]
pub struct ToolContext {
    /// Visibility scope for this request
    pub scope: ContextScope,
    /// Where resource reads are recorded, when the caller wants citations
    pub tracker: Option<Arc<dyn ResourceTracker>>,
}

impl ToolContext {
    /// Context with the given scope and no read tracking
    pub fn new(scope: ContextScope) -> Self {
        Self {
            scope,
            tracker: None,
        }
    }

    /// Unscoped context with no read tracking (diagnostics, tests)
    pub fn unscoped() -> Self {
        Self::new(ContextScope::unscoped())
    }

    /// Attach a resource tracker
    pub fn with_tracker(mut self, tracker: Arc<dyn ResourceTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Record a resource read, if anyone is listening
    pub fn record_read(&self, uri: &str) {
        if let Some(tracker) = &self.tracker {
            tracker.record_read(uri);
        }
    }
}

/// A component that can execute one or more tools, either directly
/// (built-ins) or by delegating to external tool servers.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Unique provider name
    fn name(&self) -> &str;

    /// Capability tags, e.g. `["workbooks"]` or `["mcp"]`
    fn capabilities(&self) -> Vec<String>;

    /// Routing priority for the fallback scan; higher wins
    fn priority(&self) -> i32 {
        0
    }

    /// Current lifecycle state
    fn lifecycle(&self) -> ProviderLifecycle;

    /// Prepare the provider for execution (discover tools, warm caches)
    async fn initialize(&self) -> Result<(), ToolProviderError>;

    /// Release resources; the provider will not execute again
    async fn shutdown(&self) -> Result<(), ToolProviderError>;

    /// Whether this provider can execute the named tool right now
    fn can_execute(&self, tool_name: &str) -> bool;

    /// Execute one tool call, returning a human-readable result string
    async fn execute_tool(
        &self,
        call: &ToolCall,
        context: &ToolContext,
        timeout: Duration,
    ) -> Result<String, ToolProviderError>;

    /// Health check; failures are mapped to `Unknown` by the registry
    async fn get_health(&self) -> Result<ProviderHealth, ToolProviderError>;

    /// The tools this provider currently offers
    async fn available_tools(&self) -> Result<Vec<ToolDefinition>, ToolProviderError>;
}
