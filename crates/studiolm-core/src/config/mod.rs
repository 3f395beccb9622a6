//! Configuration types and providers
//!
//! The host application owns configuration persistence (its settings UI,
//! a config file, whatever); this module defines the shapes the core
//! consumes plus a `ConfigProvider` seam with an in-memory implementation.

mod memory;
mod traits;

pub use memory::MemoryConfigProvider;
pub use traits::{ConfigError, ConfigProvider, ConfigResult};

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which chat backend family a configuration targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// OpenAI chat-completions wire protocol (native tool calls)
    OpenAi,
    /// Gemini generateContent wire protocol (native function calls)
    Gemini,
    /// Ollama chat wire protocol (no native tool calling)
    Ollama,
}

impl BackendKind {
    /// Canonical backend name, also the secret-store key for its API key
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "openai",
            BackendKind::Gemini => "gemini",
            BackendKind::Ollama => "ollama",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Configuration for one chat backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend family
    pub kind: BackendKind,
    /// Model identifier as used by the backend's API
    pub model: String,
    /// Custom API base URL (defaults per backend)
    #[serde(rename = "apiBase", skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// API key; when absent the key is resolved through the secret store
    #[serde(rename = "apiKey", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate per turn
    #[serde(rename = "maxTokens", skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl BackendConfig {
    /// Create a config for the given backend and model
    pub fn new(kind: BackendKind, model: impl Into<String>) -> Self {
        Self {
            kind,
            model: model.into(),
            api_base: None,
            api_key: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set a custom API base URL
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    /// Set the API key directly
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the max tokens per turn
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Tunables for the orchestrator and tool execution.
///
/// The scope-resolution timeout lives on `ScopeResolver`, which the host
/// constructs alongside this config.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Hard bound on backend turns per request
    pub max_turns: usize,
    /// Per-tool-call timeout
    pub tool_timeout: Duration,
    /// Total attempts per tool call (1 = no retry)
    pub max_retries: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_turns: 25,
            tool_timeout: Duration::from_secs(30),
            max_retries: 1,
        }
    }
}
