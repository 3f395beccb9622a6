//! Per-request state
//!
//! One `RequestContext` is created at the start of every chat request and
//! dropped at its end. It carries everything that must not leak between
//! concurrent requests: the memoized scope, the activity emitter and the
//! accumulator of resources read for citations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::OnceCell;

use crate::scope::ScopeResolver;
use crate::tools::ResourceTracker;
use crate::types::{ActivityCallback, ActivityEvent, ContextScope};

/// Request-scoped context threaded through one chat request
pub struct RequestContext {
    request_id: String,
    on_activity: Option<ActivityCallback>,
    started: Instant,
    next_step: AtomicU64,
    resources_read: Mutex<Vec<String>>,
    scope: OnceCell<ContextScope>,
}

impl RequestContext {
    /// Create a fresh context for one request
    pub fn new(request_id: impl Into<String>, on_activity: Option<ActivityCallback>) -> Self {
        Self {
            request_id: request_id.into(),
            on_activity,
            started: Instant::now(),
            next_step: AtomicU64::new(0),
            resources_read: Mutex::new(Vec::new()),
            scope: OnceCell::new(),
        }
    }

    /// The id identifying this request in activity events and logs
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Resolve the scope once for this request; later calls return the
    /// memoized value without touching the resolver again.
    pub async fn active_scope(
        &self,
        resolver: &ScopeResolver,
        ignore_scope: bool,
    ) -> ContextScope {
        self.scope
            .get_or_init(|| async { resolver.resolve(ignore_scope).await })
            .await
            .clone()
    }

    /// Milliseconds since the request started; monotonic within a request
    fn ts_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn emit(&self, event: ActivityEvent) {
        // fire-and-forget: no callback, no delivery
        if let Some(callback) = &self.on_activity {
            callback(event);
        }
    }

    /// Emit a `Thinking` event
    pub fn emit_thinking(&self) {
        let step_id = self.next_step.fetch_add(1, Ordering::Relaxed);
        self.emit(ActivityEvent::Thinking {
            request_id: self.request_id.clone(),
            step_id,
            ts_ms: self.ts_ms(),
        });
    }

    /// Emit a `ToolStart` event and return the step id correlating the
    /// matching `ToolEnd`
    pub fn emit_tool_start(&self, tool_name: &str) -> u64 {
        let step_id = self.next_step.fetch_add(1, Ordering::Relaxed);
        self.emit(ActivityEvent::ToolStart {
            request_id: self.request_id.clone(),
            step_id,
            ts_ms: self.ts_ms(),
            tool_name: tool_name.to_string(),
        });
        step_id
    }

    /// Emit the `ToolEnd` paired with `emit_tool_start`
    pub fn emit_tool_end(&self, step_id: u64, tool_name: &str, success: bool) {
        self.emit(ActivityEvent::ToolEnd {
            request_id: self.request_id.clone(),
            step_id,
            ts_ms: self.ts_ms(),
            tool_name: tool_name.to_string(),
            success,
        });
    }

    /// Every distinct resource read during this request, in first-read
    /// order
    pub fn resources_read(&self) -> Vec<String> {
        self.resources_read.lock().clone()
    }
}

impl ResourceTracker for RequestContext {
    fn record_read(&self, uri: &str) {
        let mut reads = self.resources_read.lock();
        if !reads.iter().any(|r| r == uri) {
            reads.push(uri.to_string());
        }
    }
}
