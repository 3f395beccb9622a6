//! Tool registry, providers and execution
//!
//! Three layers:
//! - `ToolRegistry`: which tools exist and which server owns each
//! - `ToolProvider`: something that can execute tools, either the
//!   built-in workbook provider or an external provider fronting tool
//!   servers
//! - `ToolProviderRegistry`: owns providers, routes calls, collapses
//!   every failure into a structured result

mod builtin;
mod provider;
mod provider_registry;
mod registry;
mod server_provider;

pub use builtin::{BuiltinToolProvider, BUILTIN_PROVIDER_NAME};
pub use provider::{
    HealthStatus, ProviderHealth, ProviderLifecycle, ResourceTracker, ToolContext, ToolProvider,
    ToolProviderError,
};
pub use provider_registry::{ExecuteOptions, ProviderRegistryError, ToolProviderRegistry};
pub use registry::{RegisteredTool, ToolRegistry, ToolSubscription};
pub use server_provider::ServerToolProvider;
