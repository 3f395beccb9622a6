//! Backend adapter trait definition

use async_trait::async_trait;

use crate::types::{ChatMessage, ToolCall, ToolDefinition};

use super::error::BackendResult;

/// The outcome of one backend turn
#[derive(Debug, Clone)]
pub enum BackendTurn {
    /// The backend produced a final text answer
    Final(String),
    /// The backend requested tool calls
    ToolCalls {
        /// Assistant text that accompanied the calls, if any
        content: String,
        /// The requested calls, in request order
        calls: Vec<ToolCall>,
    },
}

impl BackendTurn {
    /// Convenience constructor for a tool-call turn without text
    pub fn calls(calls: Vec<ToolCall>) -> Self {
        BackendTurn::ToolCalls {
            content: String::new(),
            calls,
        }
    }
}

/// Adapter for one chat backend family.
///
/// Each adapter translates the internal message/tool model into the
/// backend's wire shape and back; the orchestrator never sees wire
/// formats. A transport or protocol failure is a hard error of the
/// whole request.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Backend name, e.g. "openai"
    fn name(&self) -> &str;

    /// Run one turn: send the conversation and available tools, get back
    /// either a final answer or requested tool calls.
    async fn turn(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> BackendResult<BackendTurn>;
}

impl std::fmt::Debug for dyn BackendAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendAdapter")
            .field("name", &self.name())
            .finish()
    }
}
