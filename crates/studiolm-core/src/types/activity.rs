//! Activity events for UI progress feedback

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A best-effort progress notification emitted during a chat request.
///
/// Purely observational: the orchestrator never reads these back.
/// `step_id` correlates a `ToolStart` with its `ToolEnd`; `ts_ms` is
/// milliseconds since the request started and is monotonically increasing
/// within one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityEvent {
    /// The backend is producing a response
    Thinking {
        #[serde(rename = "requestId")]
        request_id: String,
        #[serde(rename = "stepId")]
        step_id: u64,
        #[serde(rename = "tsMs")]
        ts_ms: u64,
    },
    /// A tool execution started
    ToolStart {
        #[serde(rename = "requestId")]
        request_id: String,
        #[serde(rename = "stepId")]
        step_id: u64,
        #[serde(rename = "tsMs")]
        ts_ms: u64,
        #[serde(rename = "toolName")]
        tool_name: String,
    },
    /// A tool execution finished
    ToolEnd {
        #[serde(rename = "requestId")]
        request_id: String,
        #[serde(rename = "stepId")]
        step_id: u64,
        #[serde(rename = "tsMs")]
        ts_ms: u64,
        #[serde(rename = "toolName")]
        tool_name: String,
        success: bool,
    },
}

impl ActivityEvent {
    /// The step id correlating start/end pairs
    pub fn step_id(&self) -> u64 {
        match self {
            ActivityEvent::Thinking { step_id, .. }
            | ActivityEvent::ToolStart { step_id, .. }
            | ActivityEvent::ToolEnd { step_id, .. } => *step_id,
        }
    }
}

/// Callback receiving activity events; delivery is fire-and-forget.
pub type ActivityCallback = Arc<dyn Fn(ActivityEvent) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_kind_tag() {
        let event = ActivityEvent::ToolStart {
            request_id: "req-1".to_string(),
            step_id: 3,
            ts_ms: 12,
            tool_name: "list_workbooks".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"tool_start\""));
        assert!(json.contains("\"toolName\":\"list_workbooks\""));
        assert_eq!(event.step_id(), 3);
    }
}
