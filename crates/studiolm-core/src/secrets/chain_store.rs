//! Chained secret store with fallback behavior

use std::sync::Arc;

use super::traits::{SecretStore, SecretStoreError, SecretStoreResult};

/// A secret store that tries several stores in order.
///
/// Reads return the first match; writes and deletes go to the first store
/// (typically a `MemorySecretStore` in front of a read-only `EnvSecretStore`).
pub struct ChainSecretStore {
    stores: Vec<Arc<dyn SecretStore>>,
}

impl ChainSecretStore {
    /// Create a new chain store; stores are tried in order for reads.
    pub fn new(stores: Vec<Arc<dyn SecretStore>>) -> Self {
        assert!(
            !stores.is_empty(),
            "ChainSecretStore requires at least one store"
        );
        Self { stores }
    }

    /// The store that receives writes
    fn write_store(&self) -> &Arc<dyn SecretStore> {
        &self.stores[0]
    }
}

impl SecretStore for ChainSecretStore {
    fn name(&self) -> &str {
        "chain"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.stores.iter().find_map(|s| s.get(key))
    }

    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        self.write_store().store(key, value)
    }

    fn delete(&self, key: &str) -> SecretStoreResult<()> {
        // Delete from every store that has the key so a later read does
        // not resurface it from a fallback store.
        let mut deleted = false;
        for store in &self.stores {
            if store.has(key) && store.delete(key).is_ok() {
                deleted = true;
            }
        }
        if deleted {
            Ok(())
        } else {
            Err(SecretStoreError::NotFound(key.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::MemorySecretStore;

    #[test]
    fn test_chain_read_order() {
        let first = Arc::new(MemorySecretStore::new());
        let second = Arc::new(MemorySecretStore::new());
        second.store("gemini", "from-second").unwrap();

        let chain = ChainSecretStore::new(vec![first.clone(), second.clone()]);
        assert_eq!(chain.get("gemini").as_deref(), Some("from-second"));

        first.store("gemini", "from-first").unwrap();
        assert_eq!(chain.get("gemini").as_deref(), Some("from-first"));
    }

    #[test]
    fn test_chain_writes_to_first() {
        let first = Arc::new(MemorySecretStore::new());
        let second = Arc::new(MemorySecretStore::new());
        let chain = ChainSecretStore::new(vec![first.clone(), second.clone()]);

        chain.store("openai", "sk-1").unwrap();
        assert_eq!(first.get("openai").as_deref(), Some("sk-1"));
        assert_eq!(second.get("openai"), None);
    }

    #[test]
    fn test_chain_delete_removes_everywhere() {
        let first = Arc::new(MemorySecretStore::new());
        let second = Arc::new(MemorySecretStore::new());
        first.store("k", "a").unwrap();
        second.store("k", "b").unwrap();

        let chain = ChainSecretStore::new(vec![first, second]);
        chain.delete("k").unwrap();
        assert_eq!(chain.get("k"), None);
    }
}
