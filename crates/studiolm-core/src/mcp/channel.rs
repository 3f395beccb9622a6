//! Request/response channel to external tool servers

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::types::ToolDefinition;

/// Errors from a tool-server channel
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Not connected to server: {0}")]
    NotConnected(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Tool call failed: {0}")]
    ToolCallFailed(String),

    #[error("Tool call timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

pub type McpResult<T> = Result<T, McpError>;

/// A request/response channel to one or more named tool servers.
///
/// Server processes are started and stopped by the application; a channel
/// only reflects what it can currently reach.
#[async_trait]
pub trait ToolServerChannel: Send + Sync {
    /// List the tools a server currently advertises
    async fn list_tools(&self, server: &str) -> McpResult<Vec<ToolDefinition>>;

    /// Call a tool on a server, bounded by `timeout`
    async fn call_tool(
        &self,
        server: &str,
        name: &str,
        arguments: Value,
        timeout: Duration,
    ) -> McpResult<String>;

    /// Whether the server is currently reachable
    async fn is_running(&self, server: &str) -> bool;
}
