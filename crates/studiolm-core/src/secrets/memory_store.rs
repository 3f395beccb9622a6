//! In-memory secret store for tests and host-provided keys

use std::collections::HashMap;

use parking_lot::RwLock;

use super::traits::{SecretStore, SecretStoreError, SecretStoreResult};

/// Writable in-memory secret store
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given secrets
    pub fn with_secrets(secrets: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            secrets: RwLock::new(secrets.into_iter().collect()),
        }
    }
}

impl SecretStore for MemorySecretStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.secrets.read().get(key).cloned()
    }

    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        self.secrets
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> SecretStoreResult<()> {
        match self.secrets.write().remove(key) {
            Some(_) => Ok(()),
            None => Err(SecretStoreError::NotFound(key.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemorySecretStore::new();
        assert_eq!(store.get("openai"), None);

        store.store("openai", "sk-test").unwrap();
        assert_eq!(store.get("openai").as_deref(), Some("sk-test"));
        assert!(store.has("openai"));

        store.delete("openai").unwrap();
        assert_eq!(store.get("openai"), None);
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let store = MemorySecretStore::new();
        assert!(matches!(
            store.delete("nope"),
            Err(SecretStoreError::NotFound(_))
        ));
    }
}
