//! MCP channel using the official rmcp SDK
//!
//! Connects to the application's tool servers over HTTP or a Unix socket
//! and exposes them through `ToolServerChannel`, one connection per
//! server name.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use rmcp::{
    model::{CallToolRequestParams, CallToolResult, ClientCapabilities, ClientInfo, Implementation},
    service::RunningService,
    RoleClient, ServiceExt,
};
use serde_json::Value;

#[cfg(unix)]
use tokio::net::UnixStream;

use crate::logging::Logger;
use crate::types::ToolDefinition;

use super::channel::{McpError, McpResult, ToolServerChannel};

type Connection = Arc<RunningService<RoleClient, ClientInfo>>;

/// MCP client channel multiplexing several named tool servers
pub struct McpChannel {
    connections: RwLock<HashMap<String, Connection>>,
    logger: Arc<dyn Logger>,
}

impl McpChannel {
    /// Create a channel with no connections
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            logger,
        }
    }

    fn client_info() -> ClientInfo {
        ClientInfo {
            meta: None,
            protocol_version: Default::default(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: "studiolm-core".to_string(),
                title: Some("StudioLM Core".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                website_url: None,
                icons: None,
            },
        }
    }

    /// Connect to a tool server over a Unix socket and register it under
    /// `server`
    #[cfg(unix)]
    pub async fn connect_unix<P: AsRef<Path>>(
        &self,
        server: impl Into<String>,
        socket_path: P,
    ) -> McpResult<()> {
        let server = server.into();
        let path = socket_path.as_ref();
        self.logger.info(&format!(
            "[McpChannel] Connecting '{}' via Unix socket {:?}",
            server, path
        ));

        let stream = UnixStream::connect(path)
            .await
            .map_err(|e| McpError::ConnectionFailed(e.to_string()))?;

        let client = Self::client_info()
            .serve(stream)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;

        self.connections.write().insert(server.clone(), Arc::new(client));
        self.logger
            .info(&format!("[McpChannel] '{}' connected and initialized", server));
        Ok(())
    }

    /// Connect to a tool server over HTTP (Streamable HTTP transport) and
    /// register it under `server`
    pub async fn connect_http(&self, server: impl Into<String>, url: &str) -> McpResult<()> {
        use rmcp::transport::StreamableHttpClientTransport;

        let server = server.into();
        self.logger
            .info(&format!("[McpChannel] Connecting '{}' via HTTP {}", server, url));

        let transport = StreamableHttpClientTransport::from_uri(url);

        let client = Self::client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;

        self.connections.write().insert(server.clone(), Arc::new(client));
        self.logger
            .info(&format!("[McpChannel] '{}' connected and initialized", server));
        Ok(())
    }

    /// Drop the connection to a server; cancels the session if this
    /// channel holds the last reference
    pub async fn disconnect(&self, server: &str) -> McpResult<()> {
        let removed = self.connections.write().remove(server);
        let Some(conn) = removed else {
            return Err(McpError::NotConnected(server.to_string()));
        };
        self.logger
            .info(&format!("[McpChannel] Disconnecting '{}'", server));
        if let Ok(client) = Arc::try_unwrap(conn) {
            client
                .cancel()
                .await
                .map_err(|e| McpError::Protocol(e.to_string()))?;
        }
        Ok(())
    }

    /// Server names this channel currently holds connections for
    pub fn connected_servers(&self) -> Vec<String> {
        self.connections.read().keys().cloned().collect()
    }

    fn connection(&self, server: &str) -> McpResult<Connection> {
        self.connections
            .read()
            .get(server)
            .cloned()
            .ok_or_else(|| McpError::NotConnected(server.to_string()))
    }

    /// Flatten the text content blocks of a call result into one string
    fn result_text(result: &CallToolResult) -> String {
        use rmcp::model::RawContent;

        result
            .content
            .iter()
            .filter_map(|c| match &c.raw {
                RawContent::Text(t) => Some(t.text.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl ToolServerChannel for McpChannel {
    async fn list_tools(&self, server: &str) -> McpResult<Vec<ToolDefinition>> {
        let conn = self.connection(server)?;

        let result = conn
            .list_tools(Default::default())
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;

        self.logger.debug(&format!(
            "[McpChannel] '{}' advertises {} tools",
            server,
            result.tools.len()
        ));

        Ok(result
            .tools
            .into_iter()
            .map(|tool| ToolDefinition {
                name: tool.name.to_string(),
                description: tool.description.map(|s| s.to_string()).unwrap_or_default(),
                input_schema: serde_json::to_value(tool.input_schema.as_ref())
                    .unwrap_or(Value::Object(Default::default())),
            })
            .collect())
    }

    async fn call_tool(
        &self,
        server: &str,
        name: &str,
        arguments: Value,
        timeout: Duration,
    ) -> McpResult<String> {
        let conn = self.connection(server)?;

        self.logger
            .debug(&format!("[McpChannel] '{}' call_tool {}", server, name));

        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: arguments.as_object().cloned(),
            task: None,
        };

        let result = tokio::time::timeout(timeout, conn.call_tool(params))
            .await
            .map_err(|_| McpError::Timeout(timeout))?
            .map_err(|e| McpError::ToolCallFailed(e.to_string()))?;

        let text = Self::result_text(&result);
        if result.is_error.unwrap_or(false) {
            return Err(McpError::ToolCallFailed(if text.is_empty() {
                format!("tool {} reported an error", name)
            } else {
                text
            }));
        }
        Ok(text)
    }

    async fn is_running(&self, server: &str) -> bool {
        self.connections.read().contains_key(server)
    }
}
