//! Gemini backend adapter
//!
//! Speaks the `models/{model}:generateContent` wire protocol. Tool calls
//! are `functionCall` parts inside model content and results go back as
//! `functionResponse` parts; there are no call ids on the wire, so the
//! adapter synthesizes them. Function names are restricted to a narrow
//! character set, so every call builds a fresh `ToolNameMap` and converts
//! names in both directions through it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::BackendConfig;
use crate::logging::Logger;
use crate::types::{ChatMessage, MessageRole, ToolCall, ToolDefinition};

use super::error::{BackendError, BackendResult};
use super::sanitize::ToolNameMap;
use super::traits::{BackendAdapter, BackendTurn};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Backend adapter for the Gemini generateContent API
pub struct GeminiBackend {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    logger: Arc<dyn Logger>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireToolGroup>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<WireGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<WireFunctionResponse>,
}

impl WirePart {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            function_call: None,
            function_response: None,
        }
    }

    fn call(name: String, args: Value) -> Self {
        Self {
            text: None,
            function_call: Some(WireFunctionCall { name, args }),
            function_response: None,
        }
    }

    fn response(name: String, response: Value) -> Self {
        Self {
            text: None,
            function_call: None,
            function_response: Some(WireFunctionResponse { name, response }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireToolGroup {
    function_declarations: Vec<WireFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct WireFunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    content: Option<WireContent>,
}

#[derive(Debug, Deserialize)]
struct WireErrorResponse {
    error: WireErrorDetail,
}

#[derive(Debug, Deserialize)]
struct WireErrorDetail {
    message: String,
}

impl GeminiBackend {
    /// Create an adapter from a backend configuration and resolved key
    pub fn new(
        config: &BackendConfig,
        api_key: String,
        logger: Arc<dyn Logger>,
    ) -> BackendResult<Self> {
        if api_key.is_empty() {
            return Err(BackendError::missing_api_key("gemini"));
        }
        Ok(Self {
            client: Client::new(),
            api_base: config
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            logger,
        })
    }

    /// Split the conversation into a system instruction and wire contents.
    ///
    /// Tool results need the wire name of the function they answer; the
    /// id -> name mapping comes from earlier assistant tool calls in the
    /// same conversation.
    fn convert_messages(
        messages: &[ChatMessage],
        names: &ToolNameMap,
    ) -> (Option<WireContent>, Vec<WireContent>) {
        let mut system_texts: Vec<String> = Vec::new();
        let mut contents: Vec<WireContent> = Vec::new();
        let mut call_names: HashMap<String, String> = HashMap::new();

        for msg in messages {
            match msg.role {
                MessageRole::System => system_texts.push(msg.content.clone()),
                MessageRole::User => contents.push(WireContent {
                    role: Some("user".to_string()),
                    parts: vec![WirePart::text(msg.content.clone())],
                }),
                MessageRole::Assistant => {
                    let mut parts: Vec<WirePart> = Vec::new();
                    if !msg.content.is_empty() {
                        parts.push(WirePart::text(msg.content.clone()));
                    }
                    if let Some(calls) = &msg.tool_calls {
                        for call in calls {
                            call_names.insert(call.id.clone(), call.name.clone());
                            parts.push(WirePart::call(
                                names.wire_name(&call.name).to_string(),
                                call.arguments.clone(),
                            ));
                        }
                    }
                    if parts.is_empty() {
                        parts.push(WirePart::text(String::new()));
                    }
                    contents.push(WireContent {
                        role: Some("model".to_string()),
                        parts,
                    });
                }
                MessageRole::Tool => {
                    let tool_name = msg
                        .tool_call_id
                        .as_ref()
                        .and_then(|id| call_names.get(id).cloned())
                        .unwrap_or_else(|| "unknown".to_string());
                    contents.push(WireContent {
                        role: Some("user".to_string()),
                        parts: vec![WirePart::response(
                            names.wire_name(&tool_name).to_string(),
                            serde_json::json!({ "result": msg.content }),
                        )],
                    });
                }
            }
        }

        let system = if system_texts.is_empty() {
            None
        } else {
            Some(WireContent {
                role: None,
                parts: vec![WirePart::text(system_texts.join("\n\n"))],
            })
        };
        (system, contents)
    }

    fn convert_tools(tools: &[ToolDefinition], names: &ToolNameMap) -> Vec<WireToolGroup> {
        vec![WireToolGroup {
            function_declarations: tools
                .iter()
                .map(|tool| WireFunctionDeclaration {
                    name: names.wire_name(&tool.name).to_string(),
                    description: tool.description.clone(),
                    parameters: tool.input_schema.clone(),
                })
                .collect(),
        }]
    }

    /// Map a response candidate back to the internal model. Synthesized
    /// ids are seeded with the conversation length so they stay unique
    /// across turns of one request.
    fn parse_turn(
        &self,
        response: GenerateContentResponse,
        names: &ToolNameMap,
        id_seed: usize,
    ) -> BackendResult<BackendTurn> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::invalid_response("gemini", "no candidates in response"))?;
        let content = candidate
            .content
            .ok_or_else(|| BackendError::invalid_response("gemini", "candidate has no content"))?;

        let mut text = String::new();
        let mut calls: Vec<ToolCall> = Vec::new();
        for part in content.parts {
            if let Some(t) = part.text {
                text.push_str(&t);
            }
            if let Some(call) = part.function_call {
                let tool_name = names.tool_name(&call.name).to_string();
                let id = format!("call-{}-{}", id_seed, calls.len());
                calls.push(ToolCall::new(id, tool_name, call.args));
            }
        }

        if calls.is_empty() {
            Ok(BackendTurn::Final(text))
        } else {
            Ok(BackendTurn::ToolCalls {
                content: text,
                calls,
            })
        }
    }

    async fn error_from_response(&self, response: reqwest::Response) -> BackendError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<WireErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        BackendError::api_error("gemini", status, message)
    }
}

#[async_trait]
impl BackendAdapter for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn turn(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> BackendResult<BackendTurn> {
        // the name map lives for this single call; the tool set may have
        // changed by the next turn
        let names = ToolNameMap::build(tools);
        let (system_instruction, contents) = Self::convert_messages(messages, &names);

        let request = GenerateContentRequest {
            system_instruction,
            contents,
            tools: if tools.is_empty() {
                None
            } else {
                Some(Self::convert_tools(tools, &names))
            },
            generation_config: if self.temperature.is_none() && self.max_tokens.is_none() {
                None
            } else {
                Some(WireGenerationConfig {
                    temperature: self.temperature,
                    max_output_tokens: self.max_tokens,
                })
            },
        };

        self.logger.debug(&format!(
            "[GeminiBackend] Sending {} messages, {} tools",
            messages.len(),
            tools.len()
        ));

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.api_base, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response).await);
        }

        let parsed: GenerateContentResponse = response.json().await?;
        self.parse_turn(parsed, &names, messages.len())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::BackendKind;
    use crate::logging::NoOpLogger;

    fn backend() -> GeminiBackend {
        GeminiBackend::new(
            &BackendConfig::new(BackendKind::Gemini, "gemini-2.0-flash"),
            "key".to_string(),
            Arc::new(NoOpLogger::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_system_messages_become_system_instruction() {
        let names = ToolNameMap::build(&[]);
        let messages = vec![
            ChatMessage::system("be helpful"),
            ChatMessage::system("cite sources"),
            ChatMessage::user("hi"),
        ];
        let (system, contents) = GeminiBackend::convert_messages(&messages, &names);
        let system = system.unwrap();
        assert_eq!(
            system.parts[0].text.as_deref(),
            Some("be helpful\n\ncite sources")
        );
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].role.as_deref(), Some("user"));
    }

    #[test]
    fn test_tool_roundtrip_uses_wire_names() {
        let tools = vec![ToolDefinition::new("rag/search docs", "search")];
        let names = ToolNameMap::build(&tools);
        let messages = vec![
            ChatMessage::user("find gear notes"),
            ChatMessage::assistant_with_tool_calls(
                "",
                vec![ToolCall::new("call-2-0", "rag/search docs", json!({"query": "gear"}))],
            ),
            ChatMessage::tool("call-2-0", "two matches"),
        ];
        let (_, contents) = GeminiBackend::convert_messages(&messages, &names);

        let call_part = &contents[1].parts[0];
        assert_eq!(
            call_part.function_call.as_ref().unwrap().name,
            "rag_search_docs"
        );
        let response_part = &contents[2].parts[0];
        let fr = response_part.function_response.as_ref().unwrap();
        assert_eq!(fr.name, "rag_search_docs");
        assert_eq!(fr.response.get("result").unwrap(), "two matches");
    }

    #[test]
    fn test_parse_function_call_maps_back_to_tool_name() {
        let tools = vec![ToolDefinition::new("rag/search docs", "search")];
        let names = ToolNameMap::build(&tools);
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "functionCall": { "name": "rag_search_docs", "args": { "query": "gear" } } }
                    ]
                }
            }]
        }))
        .unwrap();

        match backend().parse_turn(response, &names, 4).unwrap() {
            BackendTurn::ToolCalls { calls, .. } => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].name, "rag/search docs");
                assert_eq!(calls[0].id, "call-4-0");
            }
            other => panic!("expected tool calls, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_text_is_final() {
        let names = ToolNameMap::build(&[]);
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Done." }] }
            }]
        }))
        .unwrap();
        match backend().parse_turn(response, &names, 0).unwrap() {
            BackendTurn::Final(text) => assert_eq!(text, "Done."),
            other => panic!("expected final, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_candidates_is_invalid() {
        let names = ToolNameMap::build(&[]);
        let response: GenerateContentResponse =
            serde_json::from_value(json!({ "candidates": [] })).unwrap();
        assert!(matches!(
            backend().parse_turn(response, &names, 0),
            Err(BackendError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_function_declarations_are_sanitized() {
        let tools = vec![ToolDefinition::new("7zip extract", "unpack")];
        let names = ToolNameMap::build(&tools);
        let groups = GeminiBackend::convert_tools(&tools, &names);
        assert_eq!(groups[0].function_declarations[0].name, "_7zip_extract");
    }
}
