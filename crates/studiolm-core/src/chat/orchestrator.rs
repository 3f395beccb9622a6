//! Chat orchestrator
//!
//! The top-level loop driving one chat request:
//! build messages (system prompt + history + explicit-reference preloads),
//! call the backend, execute any requested tool calls, fold the results
//! back into the conversation and call again until the backend produces a
//! final text answer. Tool failures degrade to error strings inside the
//! conversation; only backend transport failures and the turn-limit guard
//! fail the whole request.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::backends::{BackendAdapter, BackendError, BackendTurn};
use crate::config::OrchestratorConfig;
use crate::logging::Logger;
use crate::scope::ScopeResolver;
use crate::tools::{ExecuteOptions, ResourceTracker, ToolContext, ToolProviderRegistry};
use crate::types::{ActivityCallback, ChatMessage, ContextScope, MessageRole, ToolCall};
use crate::workbooks::WorkbookStore;

use super::preload::scan_references;
use super::request::RequestContext;

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(0);

const DEFAULT_SYSTEM_PROMPT: &str = "You are the StudioLM assistant. You help the user work with \
    their workbooks of documents. Ground your answers in document content using the available \
    tools; say so when the documents do not contain the answer.";

/// Hard failures of a chat request
#[derive(Error, Debug)]
pub enum ChatError {
    /// The backend could not be driven to an answer
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The backend/tool ping-pong never converged
    #[error("tool-call loop exceeded {0} turns")]
    TurnLimitExceeded(usize),
}

/// Per-request options for `chat`
#[derive(Clone, Default)]
pub struct ChatOptions {
    /// Skip context scoping for this request
    pub ignore_scope: bool,
    /// Caller-chosen request id; generated when absent
    pub request_id: Option<String>,
    /// Override the configured turn bound
    pub max_turns: Option<usize>,
    /// Activity event sink, best-effort
    pub on_activity: Option<ActivityCallback>,
}

/// Drives multi-turn exchanges with a chat backend, executing tool calls
/// through the provider registry
pub struct ChatOrchestrator {
    backend: Arc<dyn BackendAdapter>,
    providers: Arc<ToolProviderRegistry>,
    scope_resolver: Arc<ScopeResolver>,
    store: Arc<dyn WorkbookStore>,
    config: OrchestratorConfig,
    system_prompt: String,
    logger: Arc<dyn Logger>,
}

impl ChatOrchestrator {
    /// Create an orchestrator over the given collaborators
    pub fn new(
        backend: Arc<dyn BackendAdapter>,
        providers: Arc<ToolProviderRegistry>,
        scope_resolver: Arc<ScopeResolver>,
        store: Arc<dyn WorkbookStore>,
        config: OrchestratorConfig,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            backend,
            providers,
            scope_resolver,
            store,
            config,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            logger,
        }
    }

    /// Replace the default system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Run one chat request to completion and return the final answer,
    /// with citations appended when any resource was read.
    pub async fn chat(
        &self,
        history: Vec<ChatMessage>,
        options: ChatOptions,
    ) -> Result<String, ChatError> {
        let request_id = options
            .request_id
            .unwrap_or_else(|| format!("req-{}", REQUEST_SEQ.fetch_add(1, Ordering::Relaxed) + 1));
        let ctx = Arc::new(RequestContext::new(
            request_id.clone(),
            options.on_activity.clone(),
        ));
        self.logger
            .info(&format!("[ChatOrchestrator] {} started", request_id));

        self.warn_orphan_tool_results(&history, &request_id);

        let scope = ctx
            .active_scope(&self.scope_resolver, options.ignore_scope)
            .await;

        let mut messages: Vec<ChatMessage> = Vec::with_capacity(history.len() + 2);
        if !self.system_prompt.is_empty() {
            messages.push(ChatMessage::system(self.system_prompt.clone()));
        }
        messages.extend(history);
        self.preload_references(&mut messages, &scope, &ctx).await;

        let tracker: Arc<dyn ResourceTracker> = ctx.clone();
        let tool_ctx = ToolContext::new(scope).with_tracker(tracker);
        let exec_options = ExecuteOptions {
            max_retries: self.config.max_retries,
            timeout: self.config.tool_timeout,
        };
        let max_turns = options.max_turns.unwrap_or(self.config.max_turns);
        let mut executed_ids: HashSet<String> = HashSet::new();

        for turn in 0..max_turns {
            ctx.emit_thinking();
            let tools = self.providers.tool_registry().all_tools();
            match self.backend.turn(&messages, &tools).await? {
                BackendTurn::Final(text) => {
                    self.logger.info(&format!(
                        "[ChatOrchestrator] {} finished after {} turns",
                        request_id,
                        turn + 1
                    ));
                    return Ok(Self::append_citations(text, &ctx));
                }
                BackendTurn::ToolCalls { content, calls } => {
                    self.logger.debug(&format!(
                        "[ChatOrchestrator] {} turn {}: {} tool calls",
                        request_id,
                        turn + 1,
                        calls.len()
                    ));
                    messages.push(ChatMessage::assistant_with_tool_calls(content, calls.clone()));
                    for call in &calls {
                        messages.push(self.run_tool_call(call, &ctx, &tool_ctx, &exec_options, &mut executed_ids).await);
                    }
                }
            }
        }

        self.logger.error(&format!(
            "[ChatOrchestrator] {} aborted: turn limit {} exceeded",
            request_id, max_turns
        ));
        Err(ChatError::TurnLimitExceeded(max_turns))
    }

    /// Execute a single tool call from a backend turn and produce the
    /// tool-result message to append. Each call id is consumed exactly
    /// once; a repeat gets an error string instead of a second execution.
    async fn run_tool_call(
        &self,
        call: &ToolCall,
        ctx: &RequestContext,
        tool_ctx: &ToolContext,
        exec_options: &ExecuteOptions,
        executed_ids: &mut HashSet<String>,
    ) -> ChatMessage {
        if !executed_ids.insert(call.id.clone()) {
            self.logger.warn(&format!(
                "[ChatOrchestrator] Duplicate tool call id '{}' for '{}', not executing again",
                call.id, call.name
            ));
            return ChatMessage::tool(
                call.id.clone(),
                format!("Error: tool call id '{}' was already executed", call.id),
            );
        }

        let step = ctx.emit_tool_start(&call.name);
        let result = self
            .providers
            .execute_tool(call, tool_ctx, exec_options)
            .await;
        ctx.emit_tool_end(step, &call.name, result.success);
        ChatMessage::tool(call.id.clone(), result.into_message_text())
    }

    /// Direct tool execution for diagnostics and tests, bypassing the
    /// backend loop entirely. Unscoped; reads are not tracked.
    pub async fn debug_execute_tool(&self, name: &str, arguments: Value) -> String {
        let call = ToolCall::new("debug", name, arguments);
        let exec_options = ExecuteOptions {
            max_retries: self.config.max_retries,
            timeout: self.config.tool_timeout,
        };
        self.providers
            .execute_tool(&call, &ToolContext::unscoped(), &exec_options)
            .await
            .into_message_text()
    }

    /// Load explicit `workbook://` references from the latest user
    /// message. In-scope, existing resources are injected as system
    /// messages and recorded as read; everything else gets a short note
    /// so the backend knows why there is no content.
    async fn preload_references(
        &self,
        messages: &mut Vec<ChatMessage>,
        scope: &ContextScope,
        ctx: &RequestContext,
    ) {
        let Some(last_user) = messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.clone())
        else {
            return;
        };

        for reference in scan_references(&last_user) {
            let uri = reference.uri();
            if !scope.allows(&reference.workbook_id) {
                self.logger.debug(&format!(
                    "[ChatOrchestrator] Reference {} is outside the active context",
                    uri
                ));
                messages.push(ChatMessage::system(format!(
                    "The user referenced {} but its workbook is outside the active context, \
                     so it was not loaded.",
                    uri
                )));
                continue;
            }
            match self
                .store
                .read_resource(&reference.workbook_id, &reference.path)
                .await
            {
                Ok(text) => {
                    ctx.record_read(&uri);
                    messages.push(ChatMessage::system(format!(
                        "Content of {}:\n{}",
                        uri, text
                    )));
                }
                Err(e) => {
                    self.logger
                        .debug(&format!("[ChatOrchestrator] Preload of {} failed: {}", uri, e));
                    messages.push(ChatMessage::system(format!(
                        "The user referenced {} but it could not be loaded ({}).",
                        uri, e
                    )));
                }
            }
        }
    }

    /// Append the deduplicated citation list when anything was read
    fn append_citations(text: String, ctx: &RequestContext) -> String {
        let resources = ctx.resources_read();
        if resources.is_empty() {
            return text;
        }
        let mut out = text;
        out.push_str("\n\nSources:");
        for uri in resources {
            out.push_str("\n- ");
            out.push_str(&uri);
        }
        out
    }

    /// A tool-result message in supplied history with no preceding
    /// assistant tool call for its id usually means the caller mangled
    /// the history; keep it, but say so.
    fn warn_orphan_tool_results(&self, history: &[ChatMessage], request_id: &str) {
        let mut known_ids: HashSet<&str> = HashSet::new();
        for msg in history {
            if let Some(calls) = &msg.tool_calls {
                known_ids.extend(calls.iter().map(|c| c.id.as_str()));
            }
            if msg.role == MessageRole::Tool {
                match msg.tool_call_id.as_deref() {
                    Some(id) if known_ids.contains(id) => {}
                    other => self.logger.warn(&format!(
                        "[ChatOrchestrator] {} history contains a tool result with no matching \
                         assistant tool call (id: {:?})",
                        request_id, other
                    )),
                }
            }
        }
    }
}
