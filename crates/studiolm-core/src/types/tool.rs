//! Tool definitions, tool calls and execution results

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool definition as advertised to the chat backend.
///
/// Immutable once registered; a server re-registering replaces its
/// definitions wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (unique across the registry)
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON Schema for the input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Create a new tool definition with an empty object schema
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: Value::Object(Default::default()),
        }
    }

    /// Set the input schema
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }
}

/// A tool call produced by a backend turn.
///
/// Consumed by the orchestrator exactly once per `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Name of the tool being called
    pub name: String,
    /// Input arguments for the tool
    pub arguments: Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Get an argument by key
    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.arguments.get(key)
    }

    /// Get an argument as a string
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }
}

/// Error classification carried by failed execution results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolErrorCode {
    /// No registry entry and no provider claims the tool
    NoProvider,
    /// The owning provider's server is not running
    ProviderUnavailable,
    /// The provider executed and failed
    ExecutionFailed,
    /// The call exceeded the per-call timeout
    Timeout,
}

impl std::fmt::Display for ToolErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ToolErrorCode::NoProvider => "NO_PROVIDER",
            ToolErrorCode::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
            ToolErrorCode::ExecutionFailed => "EXECUTION_FAILED",
            ToolErrorCode::Timeout => "TIMEOUT",
        };
        write!(f, "{}", s)
    }
}

/// The outcome of executing one tool call.
///
/// Created fresh per call and never mutated after return; the orchestrator
/// folds it into a tool-result message and discards it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecutionResult {
    /// Whether the call succeeded
    pub success: bool,
    /// Tool output on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Error description on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Error classification on failure
    #[serde(rename = "errorCode", skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ToolErrorCode>,
    /// Name of the provider that handled (or was resolved for) the call
    #[serde(rename = "providerName")]
    pub provider_name: String,
    /// Wall-clock execution time in milliseconds
    #[serde(rename = "executionTimeMs")]
    pub execution_time_ms: u64,
    /// How many retries were performed before this outcome
    #[serde(rename = "retryCount")]
    pub retry_count: u32,
    /// Unix epoch milliseconds when execution started
    #[serde(rename = "startedAtMs")]
    pub started_at_ms: u64,
    /// Unix epoch milliseconds when execution finished
    #[serde(rename = "finishedAtMs")]
    pub finished_at_ms: u64,
}

impl ToolExecutionResult {
    /// The text to fold into the conversation: the output on success, an
    /// explanatory error string on failure.
    pub fn into_message_text(self) -> String {
        if self.success {
            self.output.unwrap_or_default()
        } else {
            let code = self
                .error_code
                .map(|c| format!(" [{}]", c))
                .unwrap_or_default();
            format!(
                "Error{}: {}",
                code,
                self.error.unwrap_or_else(|| "tool execution failed".to_string())
            )
        }
    }
}

/// Builder used by the provider registry while an execution is in flight.
#[derive(Debug)]
pub(crate) struct ExecutionTimer {
    started: std::time::Instant,
    started_at_ms: u64,
}

impl ExecutionTimer {
    pub(crate) fn start() -> Self {
        Self {
            started: std::time::Instant::now(),
            started_at_ms: epoch_ms(),
        }
    }

    pub(crate) fn success(
        &self,
        provider_name: impl Into<String>,
        output: String,
        retry_count: u32,
    ) -> ToolExecutionResult {
        ToolExecutionResult {
            success: true,
            output: Some(output),
            error: None,
            error_code: None,
            provider_name: provider_name.into(),
            execution_time_ms: self.started.elapsed().as_millis() as u64,
            retry_count,
            started_at_ms: self.started_at_ms,
            finished_at_ms: epoch_ms(),
        }
    }

    pub(crate) fn failure(
        &self,
        provider_name: impl Into<String>,
        code: ToolErrorCode,
        error: impl Into<String>,
        retry_count: u32,
    ) -> ToolExecutionResult {
        ToolExecutionResult {
            success: false,
            output: None,
            error: Some(error.into()),
            error_code: Some(code),
            provider_name: provider_name.into(),
            execution_time_ms: self.started.elapsed().as_millis() as u64,
            retry_count,
            started_at_ms: self.started_at_ms,
            finished_at_ms: epoch_ms(),
        }
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
