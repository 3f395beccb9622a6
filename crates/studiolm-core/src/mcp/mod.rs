//! External tool servers
//!
//! The workbook tool servers (rag, dashboard, spreadsheet, ...) are MCP
//! servers whose lifecycle is owned by the application; this module only
//! talks to them. `ToolServerChannel` is the seam the external tool
//! provider executes through; `McpChannel` is the rmcp-backed
//! implementation.

mod channel;
mod client;

pub use channel::{McpError, McpResult, ToolServerChannel};
pub use client::McpChannel;
