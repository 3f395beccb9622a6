//! Chat backend adapters
//!
//! One adapter per backend family, each owning that family's wire shapes:
//! - `OpenAiBackend`: chat-completions with a native `tool_calls` array
//! - `GeminiBackend`: generateContent with `functionCall` parts and a
//!   restricted function-name grammar (see `sanitize`)
//! - `OllamaBackend`: no native tool calling; structured intent is
//!   extracted from prose (see `extract`)
//! - `MockBackend`: scripted turns for tests

mod error;
mod extract;
mod gemini;
mod mock;
mod ollama;
mod openai;
mod sanitize;
mod traits;

pub use error::{BackendError, BackendResult};
pub use extract::{extract_tool_call, ExtractedToolCall};
pub use gemini::GeminiBackend;
pub use mock::{mock_backend, MockBackend};
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;
pub use sanitize::ToolNameMap;
pub use traits::{BackendAdapter, BackendTurn};

use std::sync::Arc;

use crate::config::{BackendConfig, BackendKind};
use crate::logging::Logger;
use crate::secrets::SecretStore;

/// Build the adapter for a backend configuration, resolving the API key
/// through the secret store when the config does not carry one.
pub fn backend_from_config(
    config: &BackendConfig,
    secrets: &dyn SecretStore,
    logger: Arc<dyn Logger>,
) -> BackendResult<Arc<dyn BackendAdapter>> {
    let resolve_key = || -> String {
        config
            .api_key
            .clone()
            .or_else(|| secrets.get(config.kind.name()))
            .unwrap_or_default()
    };

    Ok(match config.kind {
        BackendKind::OpenAi => Arc::new(OpenAiBackend::new(config, resolve_key(), logger)?),
        BackendKind::Gemini => Arc::new(GeminiBackend::new(config, resolve_key(), logger)?),
        BackendKind::Ollama => Arc::new(OllamaBackend::new(config, logger)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::secrets::MemorySecretStore;

    #[test]
    fn test_factory_resolves_key_from_store() {
        let secrets = MemorySecretStore::new();
        secrets.store("openai", "sk-from-store").unwrap();

        let config = BackendConfig::new(BackendKind::OpenAi, "gpt-4o-mini");
        let backend =
            backend_from_config(&config, &secrets, Arc::new(NoOpLogger::new())).unwrap();
        assert_eq!(backend.name(), "openai");
    }

    #[test]
    fn test_factory_fails_without_key() {
        let secrets = MemorySecretStore::new();
        let config = BackendConfig::new(BackendKind::Gemini, "gemini-2.0-flash");
        let err = backend_from_config(&config, &secrets, Arc::new(NoOpLogger::new())).unwrap_err();
        assert!(matches!(err, BackendError::MissingApiKey { .. }));
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let secrets = MemorySecretStore::new();
        let config = BackendConfig::new(BackendKind::Ollama, "llama3.1");
        let backend =
            backend_from_config(&config, &secrets, Arc::new(NoOpLogger::new())).unwrap();
        assert_eq!(backend.name(), "ollama");
    }
}
