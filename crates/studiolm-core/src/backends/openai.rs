//! OpenAI chat-completions backend adapter
//!
//! Speaks the `/v1/chat/completions` wire protocol with native tool
//! calling: tool definitions go out as a `tools` array of function
//! declarations, tool requests come back as a `tool_calls` array with
//! JSON-encoded argument strings.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::BackendConfig;
use crate::logging::Logger;
use crate::types::{ChatMessage, MessageRole, ToolCall, ToolDefinition};

use super::error::{BackendError, BackendResult};
use super::traits::{BackendAdapter, BackendTurn};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Backend adapter for OpenAI-compatible chat-completions APIs
pub struct OpenAiBackend {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    logger: Arc<dyn Logger>,
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    // the wire carries arguments as a JSON-encoded string
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireErrorResponse {
    error: WireErrorDetail,
}

#[derive(Debug, Deserialize)]
struct WireErrorDetail {
    message: String,
}

impl OpenAiBackend {
    /// Create an adapter from a backend configuration and resolved key
    pub fn new(
        config: &BackendConfig,
        api_key: String,
        logger: Arc<dyn Logger>,
    ) -> BackendResult<Self> {
        if api_key.is_empty() {
            return Err(BackendError::missing_api_key("openai"));
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

    fn convert_messages(messages: &[ChatMessage]) -> Vec<WireMessage> {
        messages
            .iter()
            .map(|msg| match msg.role {
                MessageRole::System => WireMessage {
                    role: "system".to_string(),
                    content: Some(msg.content.clone()),
                    tool_calls: None,
                    tool_call_id: None,
                },
                MessageRole::User => WireMessage {
                    role: "user".to_string(),
                    content: Some(msg.content.clone()),
                    tool_calls: None,
                    tool_call_id: None,
                },
                MessageRole::Assistant => {
                    let tool_calls = msg.tool_calls.as_ref().map(|calls| {
                        calls
                            .iter()
                            .map(|call| WireToolCall {
                                id: call.id.clone(),
                                call_type: "function".to_string(),
                                function: WireFunctionCall {
                                    name: call.name.clone(),
                                    arguments: call.arguments.to_string(),
                                },
                            })
                            .collect()
                    });
                    WireMessage {
                        role: "assistant".to_string(),
                        content: if msg.content.is_empty() {
                            None
                        } else {
                            Some(msg.content.clone())
                        },
                        tool_calls,
                        tool_call_id: None,
                    }
                }
                MessageRole::Tool => WireMessage {
                    role: "tool".to_string(),
                    content: Some(msg.content.clone()),
                    tool_calls: None,
                    tool_call_id: msg.tool_call_id.clone(),
                },
            })
            .collect()
    }

    fn convert_tools(tools: &[ToolDefinition]) -> Vec<WireTool> {
        tools
            .iter()
            .map(|tool| WireTool {
                tool_type: "function".to_string(),
                function: WireFunction {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.input_schema.clone(),
                },
            })
            .collect()
    }

    fn parse_turn(&self, response: ChatCompletionResponse) -> BackendResult<BackendTurn> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::invalid_response("openai", "no choices in response"))?;

        let content = choice.message.content.unwrap_or_default();
        let wire_calls = choice.message.tool_calls.unwrap_or_default();
        if wire_calls.is_empty() {
            return Ok(BackendTurn::Final(content));
        }

        let mut calls = Vec::with_capacity(wire_calls.len());
        for wire in wire_calls {
            let arguments: Value = if wire.function.arguments.trim().is_empty() {
                Value::Object(Default::default())
            } else {
                serde_json::from_str(&wire.function.arguments).unwrap_or_else(|e| {
                    self.logger.warn(&format!(
                        "[OpenAiBackend] Unparseable arguments for '{}' ({}), using empty object",
                        wire.function.name, e
                    ));
                    Value::Object(Default::default())
                })
            };
            calls.push(ToolCall::new(wire.id, wire.function.name, arguments));
        }
        Ok(BackendTurn::ToolCalls { content, calls })
    }

    async fn error_from_response(&self, response: reqwest::Response) -> BackendError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<WireErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        BackendError::api_error("openai", status, message)
    }
}

#[async_trait]
impl BackendAdapter for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn turn(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> BackendResult<BackendTurn> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: Self::convert_messages(messages),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: if tools.is_empty() {
                None
            } else {
                Some(Self::convert_tools(tools))
            },
        };

        self.logger.debug(&format!(
            "[OpenAiBackend] Sending {} messages, {} tools",
            messages.len(),
            tools.len()
        ));

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response).await);
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        self.parse_turn(parsed)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::BackendKind;
    use crate::logging::NoOpLogger;

    fn backend() -> OpenAiBackend {
        OpenAiBackend::new(
            &BackendConfig::new(BackendKind::OpenAi, "gpt-4o-mini"),
            "sk-test".to_string(),
            Arc::new(NoOpLogger::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let err = OpenAiBackend::new(
            &BackendConfig::new(BackendKind::OpenAi, "gpt-4o-mini"),
            String::new(),
            Arc::new(NoOpLogger::new()),
        )
        .unwrap_err();
        assert!(matches!(err, BackendError::MissingApiKey { .. }));
    }

    #[test]
    fn test_message_conversion_roles() {
        let messages = vec![
            ChatMessage::system("be helpful"),
            ChatMessage::user("hi"),
            ChatMessage::assistant_with_tool_calls(
                "",
                vec![ToolCall::new("call_1", "echo", json!({"msg": "hi"}))],
            ),
            ChatMessage::tool("call_1", "hi"),
        ];
        let wire = OpenAiBackend::convert_messages(&messages);

        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[1].role, "user");
        assert_eq!(wire[2].role, "assistant");
        // empty assistant content is omitted when tool calls are present
        assert!(wire[2].content.is_none());
        let calls = wire[2].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "echo");
        assert_eq!(calls[0].function.arguments, r#"{"msg":"hi"}"#);
        assert_eq!(wire[3].role, "tool");
        assert_eq!(wire[3].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_tool_conversion() {
        let tools = vec![ToolDefinition::new("echo", "Echo a message").with_schema(json!({
            "type": "object",
            "properties": { "msg": { "type": "string" } },
            "required": ["msg"]
        }))];
        let wire = OpenAiBackend::convert_tools(&tools);
        assert_eq!(wire[0].tool_type, "function");
        assert_eq!(wire[0].function.name, "echo");
        assert!(wire[0].function.parameters.get("properties").is_some());
    }

    #[test]
    fn test_parse_final_text() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{
                "message": { "role": "assistant", "content": "All done." }
            }]
        }))
        .unwrap();
        match backend().parse_turn(response).unwrap() {
            BackendTurn::Final(text) => assert_eq!(text, "All done."),
            other => panic!("expected final text, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_tool_calls() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "read_document",
                            "arguments": "{\"workbook_id\": \"wbA\", \"path\": \"notes.md\"}"
                        }
                    }]
                }
            }]
        }))
        .unwrap();
        match backend().parse_turn(response).unwrap() {
            BackendTurn::ToolCalls { calls, .. } => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].name, "read_document");
                assert_eq!(calls[0].arguments.get("path").unwrap(), "notes.md");
            }
            other => panic!("expected tool calls, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty_choices_is_invalid() {
        let response: ChatCompletionResponse =
            serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert!(matches!(
            backend().parse_turn(response),
            Err(BackendError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_garbled_arguments_degrade_to_empty_object() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "echo", "arguments": "{not json" }
                    }]
                }
            }]
        }))
        .unwrap();
        match backend().parse_turn(response).unwrap() {
            BackendTurn::ToolCalls { calls, .. } => {
                assert_eq!(calls[0].arguments, json!({}));
            }
            other => panic!("expected tool calls, got {:?}", other),
        }
    }
}
