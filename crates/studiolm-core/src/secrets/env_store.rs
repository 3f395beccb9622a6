//! Environment variable secret store

use std::collections::HashMap;
use std::env;

use once_cell::sync::Lazy;

use super::traits::{SecretStore, SecretStoreError, SecretStoreResult};

/// Mapping from backend names to environment variable names
static ENV_VAR_MAP: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("openai", vec!["OPENAI_API_KEY"]);
    m.insert("gemini", vec!["GEMINI_API_KEY", "GOOGLE_API_KEY"]);
    m.insert("ollama", vec![]); // local, no key
    m
});

/// Read-only secret store backed by environment variables
///
/// Backend names map to their conventional variables (`openai` →
/// `OPENAI_API_KEY`, `gemini` → `GEMINI_API_KEY`/`GOOGLE_API_KEY`);
/// any other key is looked up verbatim.
#[derive(Debug, Default)]
pub struct EnvSecretStore {
    _private: (),
}

impl EnvSecretStore {
    /// Create a new environment variable secret store
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl SecretStore for EnvSecretStore {
    fn name(&self) -> &str {
        "env"
    }

    fn get(&self, key: &str) -> Option<String> {
        // Try the key verbatim first
        if let Ok(value) = env::var(key) {
            if !value.is_empty() {
                return Some(value);
            }
        }

        // Then map a backend name to its conventional variables
        if let Some(env_vars) = ENV_VAR_MAP.get(key.to_lowercase().as_str()) {
            for env_var in env_vars {
                if let Ok(value) = env::var(env_var) {
                    if !value.is_empty() {
                        return Some(value);
                    }
                }
            }
        }

        None
    }

    fn store(&self, _key: &str, _value: &str) -> SecretStoreResult<()> {
        Err(SecretStoreError::ReadOnly)
    }

    fn delete(&self, _key: &str) -> SecretStoreResult<()> {
        Err(SecretStoreError::ReadOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_store_is_read_only() {
        let store = EnvSecretStore::new();
        assert!(matches!(
            store.store("k", "v"),
            Err(SecretStoreError::ReadOnly)
        ));
        assert!(matches!(store.delete("k"), Err(SecretStoreError::ReadOnly)));
    }

    #[test]
    fn test_env_store_lookup() {
        let store = EnvSecretStore::new();
        env::set_var("STUDIOLM_TEST_SECRET", "s3cret");
        assert_eq!(store.get("STUDIOLM_TEST_SECRET").as_deref(), Some("s3cret"));
        env::remove_var("STUDIOLM_TEST_SECRET");
        assert_eq!(store.get("STUDIOLM_TEST_SECRET"), None);
    }
}
