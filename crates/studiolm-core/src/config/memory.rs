//! In-memory configuration provider

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::traits::{ConfigError, ConfigProvider, ConfigResult};
use super::BackendConfig;

/// Configuration provider holding everything in memory
#[derive(Default)]
pub struct MemoryConfigProvider {
    backends: RwLock<BTreeMap<String, BackendConfig>>,
}

impl MemoryConfigProvider {
    /// Create an empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider with a single named backend
    pub fn with_backend(name: impl Into<String>, config: BackendConfig) -> Self {
        let provider = Self::new();
        provider.backends.write().insert(name.into(), config);
        provider
    }
}

#[async_trait]
impl ConfigProvider for MemoryConfigProvider {
    async fn backends(&self) -> Vec<(String, BackendConfig)> {
        self.backends
            .read()
            .iter()
            .map(|(name, config)| (name.clone(), config.clone()))
            .collect()
    }

    async fn backend(&self, name: &str) -> Option<BackendConfig> {
        self.backends.read().get(name).cloned()
    }

    async fn set_backend(&self, name: &str, config: BackendConfig) -> ConfigResult<()> {
        self.backends.write().insert(name.to_string(), config);
        Ok(())
    }

    async fn remove_backend(&self, name: &str) -> ConfigResult<()> {
        match self.backends.write().remove(name) {
            Some(_) => Ok(()),
            None => Err(ConfigError::BackendNotFound(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendKind;

    #[tokio::test]
    async fn test_memory_provider_roundtrip() {
        let provider = MemoryConfigProvider::new();
        assert!(provider.backends().await.is_empty());

        let config = BackendConfig::new(BackendKind::Ollama, "llama3.1");
        provider.set_backend("local", config).await.unwrap();

        let loaded = provider.backend("local").await.unwrap();
        assert_eq!(loaded.model, "llama3.1");

        provider.remove_backend("local").await.unwrap();
        assert!(provider.backend("local").await.is_none());
    }

    #[tokio::test]
    async fn test_remove_missing_backend() {
        let provider = MemoryConfigProvider::new();
        assert!(matches!(
            provider.remove_backend("nope").await,
            Err(ConfigError::BackendNotFound(_))
        ));
    }
}
