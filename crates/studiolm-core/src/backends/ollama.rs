//! Ollama backend adapter
//!
//! Targets local models served by Ollama's `/api/chat` endpoint. The
//! backend has no native tool calling in our integration, so the adapter
//! appends formatting instructions demanding a single JSON object
//! `{"tool": ..., "args": {...}}` and runs the raw response through the
//! free-text extractor. A response with no qualifying JSON object is the
//! final answer.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::BackendConfig;
use crate::logging::Logger;
use crate::types::{ChatMessage, MessageRole, ToolCall, ToolDefinition};

use super::error::{BackendError, BackendResult};
use super::extract::extract_tool_call;
use super::traits::{BackendAdapter, BackendTurn};

const DEFAULT_API_BASE: &str = "http://localhost:11434";

/// Backend adapter for Ollama-served local models
pub struct OllamaBackend {
    client: Client,
    api_base: String,
    model: String,
    temperature: Option<f32>,
    logger: Arc<dyn Logger>,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<WireOptions>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct WireOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<WireMessage>,
}

impl OllamaBackend {
    /// Create an adapter from a backend configuration. Ollama is local
    /// and needs no API key.
    pub fn new(config: &BackendConfig, logger: Arc<dyn Logger>) -> Self {
        Self {
            client: Client::new(),
            api_base: config
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: config.model.clone(),
            temperature: config.temperature,
            logger,
        }
    }

    /// The formatting instructions forcing structured tool calls out of a
    /// model with no native tool support
    fn tool_instructions(tools: &[ToolDefinition]) -> String {
        let mut lines = vec![
            "You can use the following tools to answer.".to_string(),
            String::new(),
        ];
        for tool in tools {
            lines.push(format!(
                "- {}: {}\n  parameters: {}",
                tool.name, tool.description, tool.input_schema
            ));
        }
        lines.push(String::new());
        lines.push(
            "To use a tool, respond with ONLY a single JSON object and no other text:\n\
             {\"tool\": \"<tool name>\", \"args\": {<arguments>}}\n\
             When you have enough information, answer the user directly in plain text \
             without any JSON."
                .to_string(),
        );
        lines.join("\n")
    }

    fn convert_messages(messages: &[ChatMessage], tools: &[ToolDefinition]) -> Vec<WireMessage> {
        let mut wire: Vec<WireMessage> = Vec::with_capacity(messages.len() + 1);
        for msg in messages {
            match msg.role {
                MessageRole::System => wire.push(WireMessage {
                    role: "system".to_string(),
                    content: msg.content.clone(),
                }),
                MessageRole::User => wire.push(WireMessage {
                    role: "user".to_string(),
                    content: msg.content.clone(),
                }),
                MessageRole::Assistant => {
                    // a tool-requesting turn is replayed as the JSON the
                    // model was asked to produce
                    let content = match &msg.tool_calls {
                        Some(calls) if !calls.is_empty() => {
                            let call = &calls[0];
                            json!({ "tool": call.name, "args": call.arguments }).to_string()
                        }
                        _ => msg.content.clone(),
                    };
                    wire.push(WireMessage {
                        role: "assistant".to_string(),
                        content,
                    });
                }
                MessageRole::Tool => wire.push(WireMessage {
                    role: "user".to_string(),
                    content: format!("Tool result:\n{}", msg.content),
                }),
            }
        }
        if !tools.is_empty() {
            wire.push(WireMessage {
                role: "system".to_string(),
                content: Self::tool_instructions(tools),
            });
        }
        wire
    }

    /// Turn a raw response into either a tool call or the final answer.
    /// The synthesized id is seeded with the conversation length so it is
    /// unique across turns of one request.
    fn parse_turn(&self, text: &str, id_seed: usize) -> BackendTurn {
        match extract_tool_call(text) {
            Some(extracted) => {
                self.logger.debug(&format!(
                    "[OllamaBackend] Extracted tool call '{}' from response",
                    extracted.tool
                ));
                BackendTurn::ToolCalls {
                    content: String::new(),
                    calls: vec![ToolCall::new(
                        format!("ollama-{}", id_seed),
                        extracted.tool,
                        extracted.args,
                    )],
                }
            }
            None => BackendTurn::Final(text.trim().to_string()),
        }
    }
}

#[async_trait]
impl BackendAdapter for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn turn(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> BackendResult<BackendTurn> {
        let request = OllamaChatRequest {
            model: self.model.clone(),
            messages: Self::convert_messages(messages, tools),
            stream: false,
            options: self
                .temperature
                .map(|temperature| WireOptions {
                    temperature: Some(temperature),
                }),
        };

        self.logger.debug(&format!(
            "[OllamaBackend] Sending {} messages, {} tools",
            messages.len(),
            tools.len()
        ));

        let response = self
            .client
            .post(format!("{}/api/chat", self.api_base))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::api_error("ollama", status, body));
        }

        let parsed: OllamaChatResponse = response.json().await?;
        let message = parsed
            .message
            .ok_or_else(|| BackendError::invalid_response("ollama", "no message in response"))?;
        Ok(self.parse_turn(&message.content, messages.len()))
    }
}
