//! Core types shared across the crate

mod activity;
mod message;
mod scope;
mod tool;

pub use activity::{ActivityCallback, ActivityEvent};
pub use message::{ChatMessage, MessageRole};
pub use scope::ContextScope;
pub use tool::{ToolCall, ToolDefinition, ToolErrorCode, ToolExecutionResult};

pub(crate) use tool::ExecutionTimer;
