//! StudioLM Core
//!
//! The tool-calling orchestration core of the StudioLM assistant: given a
//! conversation and the currently registered tools, drive a multi-turn
//! exchange with one of several interchangeable chat backends, executing
//! requested tool calls along the way, until the backend produces a final
//! answer.
//!
//! The crate is host-agnostic: document storage, context selection and
//! external tool-server lifecycle are collaborators behind traits, so the
//! embedding application (or a test) supplies them.
//!
//! ```rust,ignore
//! use studiolm_core::{
//!     backends::backend_from_config,
//!     chat::{ChatOptions, ChatOrchestrator},
//!     tools::{BuiltinToolProvider, ToolProviderRegistry, ToolRegistry},
//! };
//!
//! let tool_registry = Arc::new(ToolRegistry::new(logger.clone()));
//! let providers = Arc::new(ToolProviderRegistry::new(tool_registry, logger.clone()));
//! providers
//!     .register_provider(Arc::new(BuiltinToolProvider::new(store.clone(), logger.clone())), true)
//!     .await?;
//!
//! let backend = backend_from_config(&config, &secrets, logger.clone())?;
//! let orchestrator = ChatOrchestrator::new(backend, providers, resolver, store, Default::default(), logger);
//! let answer = orchestrator.chat(messages, ChatOptions::default()).await?;
//! ```

pub mod backends;
pub mod chat;
pub mod config;
pub mod logging;
pub mod mcp;
pub mod scope;
pub mod secrets;
pub mod tools;
pub mod types;
pub mod workbooks;

// Re-export commonly used types
pub use types::{
    ActivityCallback, ActivityEvent, ChatMessage, ContextScope, MessageRole, ToolCall,
    ToolDefinition, ToolErrorCode, ToolExecutionResult,
};

pub use backends::{
    backend_from_config, BackendAdapter, BackendError, BackendResult, BackendTurn, GeminiBackend,
    MockBackend, OllamaBackend, OpenAiBackend,
};

pub use chat::{ChatError, ChatOptions, ChatOrchestrator};

pub use config::{
    BackendConfig, BackendKind, ConfigProvider, MemoryConfigProvider, OrchestratorConfig,
};

pub use logging::{ConsoleLogger, LogLevel, Logger, NoOpLogger, SharedLogger};

pub use mcp::{McpChannel, McpError, McpResult, ToolServerChannel};

pub use scope::{ActiveScope, ScopeResolver, ScopeService};

pub use secrets::{
    ChainSecretStore, EnvSecretStore, MemorySecretStore, SecretStore, SecretStoreError,
};

pub use tools::{
    BuiltinToolProvider, ExecuteOptions, HealthStatus, ProviderHealth, ProviderLifecycle,
    ResourceTracker, ServerToolProvider, ToolContext, ToolProvider, ToolProviderError,
    ToolProviderRegistry, ToolRegistry, ToolSubscription,
};

pub use workbooks::{MemoryWorkbookStore, Workbook, WorkbookStore, WorkbookStoreError};
