//! Tool registry: name -> (definition, owning server)
//!
//! The registry is the single source of truth for which tools exist and
//! which server owns each of them. Dependents (routing tables, prompt
//! builders) subscribe and rebuild from the full list on every change
//! rather than tracking diffs; that keeps them correct under concurrent
//! provider churn at the cost of some redundant work.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::logging::Logger;
use crate::types::ToolDefinition;

/// A tool definition plus the server that owns it
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    pub definition: ToolDefinition,
    pub server_name: String,
}

type Listener = Arc<dyn Fn(&[ToolDefinition]) + Send + Sync>;

#[derive(Default)]
struct RegistryState {
    // registration order preserved so listings are stable
    tools: Vec<RegisteredTool>,
    listeners: Vec<(u64, Listener)>,
    next_listener_id: u64,
}

/// Authoritative mapping of tool name to definition and owning server
pub struct ToolRegistry {
    // shared with subscriptions, which hold a Weak to detach on drop
    state: Arc<RwLock<RegistryState>>,
    logger: Arc<dyn Logger>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            state: Arc::new(RwLock::new(RegistryState::default())),
            logger,
        }
    }

    /// Replace every tool owned by `server_name` with `tools`.
    ///
    /// The remove-then-add happens under one write lock, so subscribers
    /// observe either the old or the new complete set, never a mix. A
    /// name collision with a tool owned by another server transfers
    /// ownership to `server_name` (most recent registration wins).
    pub fn register_tools(&self, server_name: &str, tools: Vec<ToolDefinition>) {
        let snapshot = {
            let mut state = self.state.write();
            let before = state.tools.len();
            let new_names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
            state.tools.retain(|t| {
                t.server_name != server_name && !new_names.contains(&t.definition.name.as_str())
            });
            let removed = before - state.tools.len();

            if tools.is_empty() && removed == 0 {
                // nothing changed, nothing to notify
                return;
            }

            for definition in tools {
                state.tools.push(RegisteredTool {
                    definition,
                    server_name: server_name.to_string(),
                });
            }

            self.logger.debug(&format!(
                "[ToolRegistry] '{}' registered {} tools ({} replaced), {} total",
                server_name,
                state.tools.len() + removed - before,
                removed,
                state.tools.len()
            ));

            Self::snapshot(&state)
        };
        self.notify(snapshot);
    }

    /// Remove every tool owned by `server_name`. No-op (and no
    /// notification) when the server owns nothing.
    pub fn unregister_tools(&self, server_name: &str) {
        let snapshot = {
            let mut state = self.state.write();
            let before = state.tools.len();
            state.tools.retain(|t| t.server_name != server_name);
            if state.tools.len() == before {
                return;
            }
            self.logger.debug(&format!(
                "[ToolRegistry] '{}' unregistered {} tools, {} remain",
                server_name,
                before - state.tools.len(),
                state.tools.len()
            ));
            Self::snapshot(&state)
        };
        self.notify(snapshot);
    }

    /// The server owning the named tool, if any
    pub fn tool_server(&self, name: &str) -> Option<String> {
        self.state
            .read()
            .tools
            .iter()
            .find(|t| t.definition.name == name)
            .map(|t| t.server_name.clone())
    }

    /// All registered tool definitions, in registration order
    pub fn all_tools(&self) -> Vec<ToolDefinition> {
        Self::snapshot(&self.state.read())
    }

    /// All registered tools with their owning servers
    pub fn registered_tools(&self) -> Vec<RegisteredTool> {
        self.state.read().tools.clone()
    }

    /// Number of registered tools
    pub fn tool_count(&self) -> usize {
        self.state.read().tools.len()
    }

    /// Subscribe to changes. The listener is called synchronously with the
    /// full tool list after every effective mutation. Dropping the returned
    /// subscription (or calling `unsubscribe`) detaches the listener.
    pub fn subscribe(
        &self,
        listener: impl Fn(&[ToolDefinition]) + Send + Sync + 'static,
    ) -> ToolSubscription {
        let id = {
            let mut state = self.state.write();
            let id = state.next_listener_id;
            state.next_listener_id += 1;
            state.listeners.push((id, Arc::new(listener)));
            id
        };
        ToolSubscription {
            state: Arc::downgrade(&self.state),
            id,
        }
    }

    fn snapshot(state: &RegistryState) -> Vec<ToolDefinition> {
        state.tools.iter().map(|t| t.definition.clone()).collect()
    }

    // Listeners run outside the write lock so they may re-enter read
    // operations; the snapshot they receive is the set at mutation time.
    fn notify(&self, snapshot: Vec<ToolDefinition>) {
        let listeners: Vec<Listener> = self
            .state
            .read()
            .listeners
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(&snapshot);
        }
    }
}

/// Handle detaching a registry listener on drop
pub struct ToolSubscription {
    state: Weak<RwLock<RegistryState>>,
    id: u64,
}

impl ToolSubscription {
    /// Detach the listener now
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for ToolSubscription {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            state.write().listeners.retain(|(id, _)| *id != self.id);
        }
    }
}
