//! Configuration provider trait

use async_trait::async_trait;

use super::BackendConfig;

/// Errors that can occur during configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Backend not found: {0}")]
    BackendNotFound(String),

    #[error("Backend already exists: {0}")]
    BackendExists(String),

    #[error("Configuration error: {0}")]
    Other(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration provider abstraction
///
/// Implementations:
/// - `MemoryConfigProvider`: in-memory, for tests and embedding hosts
///   that push configuration directly
/// - host adapter: reads the application's settings store
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Get all configured backends, keyed by a caller-chosen name
    async fn backends(&self) -> Vec<(String, BackendConfig)>;

    /// Get one backend configuration by name
    async fn backend(&self, name: &str) -> Option<BackendConfig>;

    /// Add or replace a backend configuration
    async fn set_backend(&self, name: &str, config: BackendConfig) -> ConfigResult<()>;

    /// Remove a backend configuration
    async fn remove_backend(&self, name: &str) -> ConfigResult<()>;
}
