//! External tool provider
//!
//! Fronts one or more named tool servers reachable through a
//! `ToolServerChannel`. The provider has a single name, but each server
//! keeps its own identity: `refresh_server` re-registers a server's tools
//! in the tool registry under the *server* name, which is why provider
//! resolution needs the priority-scan fallback.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::logging::Logger;
use crate::mcp::ToolServerChannel;
use crate::types::{ToolCall, ToolDefinition};

use super::provider::{
    ProviderHealth, ProviderLifecycle, ToolContext, ToolProvider, ToolProviderError,
};
use super::registry::ToolRegistry;

#[derive(Default)]
struct RoutingState {
    // tool name -> owning server
    tool_servers: HashMap<String, String>,
    // server -> its current tool definitions
    server_tools: HashMap<String, Vec<ToolDefinition>>,
}

/// Tool provider delegating to external tool servers
pub struct ServerToolProvider {
    name: String,
    servers: Vec<String>,
    channel: Arc<dyn ToolServerChannel>,
    tool_registry: Arc<ToolRegistry>,
    routing: RwLock<RoutingState>,
    lifecycle: RwLock<ProviderLifecycle>,
    priority: i32,
    logger: Arc<dyn Logger>,
}

impl ServerToolProvider {
    /// Create a provider fronting the given servers
    pub fn new(
        name: impl Into<String>,
        servers: Vec<String>,
        channel: Arc<dyn ToolServerChannel>,
        tool_registry: Arc<ToolRegistry>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            name: name.into(),
            servers,
            channel,
            tool_registry,
            routing: RwLock::new(RoutingState::default()),
            lifecycle: RwLock::new(ProviderLifecycle::Uninitialized),
            priority: 0,
            logger,
        }
    }

    /// Set the routing priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// The servers this provider fronts
    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    async fn discover_server(&self, server: &str) -> Option<Vec<ToolDefinition>> {
        if !self.channel.is_running(server).await {
            self.logger.warn(&format!(
                "[ServerToolProvider:{}] Server '{}' is not running, skipping discovery",
                self.name, server
            ));
            return None;
        }
        match self.channel.list_tools(server).await {
            Ok(tools) => Some(tools),
            Err(e) => {
                self.logger.warn(&format!(
                    "[ServerToolProvider:{}] Tool discovery on '{}' failed: {}",
                    self.name, server, e
                ));
                None
            }
        }
    }

    fn remember_server_tools(&self, server: &str, tools: &[ToolDefinition]) {
        let mut routing = self.routing.write();
        routing
            .tool_servers
            .retain(|_, owner| owner.as_str() != server);
        for tool in tools {
            routing
                .tool_servers
                .insert(tool.name.clone(), server.to_string());
        }
        routing
            .server_tools
            .insert(server.to_string(), tools.to_vec());
    }

    /// Re-discover one server and re-register its tools in the tool
    /// registry under the server's own name. Called by the host when a
    /// tool server (re)starts.
    pub async fn refresh_server(&self, server: &str) -> Result<(), ToolProviderError> {
        if !self.servers.iter().any(|s| s == server) {
            return Err(ToolProviderError::failed(format!(
                "provider '{}' does not front server '{}'",
                self.name, server
            )));
        }
        let Some(tools) = self.discover_server(server).await else {
            // server gone: drop its tools
            self.remember_server_tools(server, &[]);
            self.tool_registry.unregister_tools(server);
            return Err(ToolProviderError::ServerUnavailable(server.to_string()));
        };

        self.logger.info(&format!(
            "[ServerToolProvider:{}] '{}' now advertises {} tools",
            self.name,
            server,
            tools.len()
        ));
        self.remember_server_tools(server, &tools);
        self.tool_registry.register_tools(server, tools);
        Ok(())
    }

    fn server_for(&self, tool_name: &str) -> Option<String> {
        self.routing.read().tool_servers.get(tool_name).cloned()
    }
}

#[async_trait]
impl ToolProvider for ServerToolProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Vec<String> {
        vec!["mcp".to_string()]
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn lifecycle(&self) -> ProviderLifecycle {
        *self.lifecycle.read()
    }

    async fn initialize(&self) -> Result<(), ToolProviderError> {
        for server in &self.servers {
            if let Some(tools) = self.discover_server(server).await {
                self.remember_server_tools(server, &tools);
            }
        }
        *self.lifecycle.write() = ProviderLifecycle::Initialized;
        let count = self.routing.read().tool_servers.len();
        self.logger.info(&format!(
            "[ServerToolProvider:{}] Initialized with {} tools from {} servers",
            self.name,
            count,
            self.servers.len()
        ));
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ToolProviderError> {
        *self.lifecycle.write() = ProviderLifecycle::Shutdown;
        // server names may own registry entries from refresh_server
        for server in &self.servers {
            self.tool_registry.unregister_tools(server);
        }
        Ok(())
    }

    fn can_execute(&self, tool_name: &str) -> bool {
        self.routing.read().tool_servers.contains_key(tool_name)
    }

    async fn execute_tool(
        &self,
        call: &ToolCall,
        _context: &ToolContext,
        timeout: Duration,
    ) -> Result<String, ToolProviderError> {
        if *self.lifecycle.read() != ProviderLifecycle::Initialized {
            return Err(ToolProviderError::NotInitialized);
        }
        let Some(server) = self.server_for(&call.name) else {
            return Err(ToolProviderError::UnknownTool(call.name.clone()));
        };
        if !self.channel.is_running(&server).await {
            return Err(ToolProviderError::ServerUnavailable(server));
        }

        self.channel
            .call_tool(&server, &call.name, call.arguments.clone(), timeout)
            .await
            .map_err(|e| ToolProviderError::failed_retryable(e.to_string()))
    }

    async fn get_health(&self) -> Result<ProviderHealth, ToolProviderError> {
        let mut down: Vec<&str> = Vec::new();
        for server in &self.servers {
            if !self.channel.is_running(server).await {
                down.push(server);
            }
        }
        Ok(if down.is_empty() {
            ProviderHealth::healthy()
        } else if down.len() == self.servers.len() {
            ProviderHealth::unhealthy("no tool server is running".to_string())
        } else {
            ProviderHealth::degraded(format!("servers down: {}", down.join(", ")))
        })
    }

    async fn available_tools(&self) -> Result<Vec<ToolDefinition>, ToolProviderError> {
        let routing = self.routing.read();
        let mut tools: Vec<ToolDefinition> = Vec::new();
        for server in &self.servers {
            if let Some(server_tools) = routing.server_tools.get(server) {
                tools.extend(server_tools.iter().cloned());
            }
        }
        Ok(tools)
    }
}
