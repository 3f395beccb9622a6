//! Chat orchestration
//!
//! `ChatOrchestrator::chat` is the single entry point callers use: it
//! takes the full conversation history (nothing is persisted here) and
//! drives backend turns and tool executions until a final answer exists.

mod orchestrator;
mod preload;
mod request;

pub use orchestrator::{ChatError, ChatOptions, ChatOrchestrator};
pub use preload::{scan_references, ExplicitReference};
pub use request::RequestContext;
