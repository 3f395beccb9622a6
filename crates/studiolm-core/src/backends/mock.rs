//! Mock backend for tests
//!
//! Scripted, deterministic turns without network dependencies. Records
//! the messages it was sent so orchestrator tests can assert on what the
//! backend actually saw.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::types::{ChatMessage, ToolDefinition};

use super::error::BackendResult;
use super::traits::{BackendAdapter, BackendTurn};

enum MockMode {
    /// Pop scripted turns in order; final fallback once exhausted
    Script(VecDeque<BackendTurn>),
    /// Return the same turn forever
    Repeat(BackendTurn),
}

/// Scripted chat backend
pub struct MockBackend {
    mode: Mutex<MockMode>,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockBackend {
    /// A backend that plays the given turns in order, then answers with
    /// an empty final text
    pub fn scripted(turns: Vec<BackendTurn>) -> Self {
        Self {
            mode: Mutex::new(MockMode::Script(turns.into())),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// A backend that always answers with the same final text
    pub fn final_text(text: impl Into<String>) -> Self {
        Self::scripted(vec![BackendTurn::Final(text.into())])
    }

    /// A backend that returns the same turn on every call (e.g. a
    /// tool-call loop that never terminates)
    pub fn repeating(turn: BackendTurn) -> Self {
        Self {
            mode: Mutex::new(MockMode::Repeat(turn)),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// The message lists received so far, one entry per turn
    pub fn seen_messages(&self) -> Vec<Vec<ChatMessage>> {
        self.seen.lock().clone()
    }

    /// Number of turns taken so far
    pub fn turns_taken(&self) -> usize {
        self.seen.lock().len()
    }
}

#[async_trait]
impl BackendAdapter for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn turn(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> BackendResult<BackendTurn> {
        self.seen.lock().push(messages.to_vec());

        let turn = match &mut *self.mode.lock() {
            MockMode::Script(turns) => turns
                .pop_front()
                .unwrap_or_else(|| BackendTurn::Final(String::new())),
            MockMode::Repeat(turn) => turn.clone(),
        };
        Ok(turn)
    }
}

/// Arc-wrapped constructor, the shape orchestrator tests want
pub fn mock_backend(turns: Vec<BackendTurn>) -> Arc<MockBackend> {
    Arc::new(MockBackend::scripted(turns))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_turns_in_order() {
        let backend = MockBackend::scripted(vec![
            BackendTurn::Final("first".to_string()),
            BackendTurn::Final("second".to_string()),
        ]);

        for expected in ["first", "second", ""] {
            match backend.turn(&[ChatMessage::user("x")], &[]).await.unwrap() {
                BackendTurn::Final(text) => assert_eq!(text, expected),
                other => panic!("expected final, got {:?}", other),
            }
        }
        assert_eq!(backend.turns_taken(), 3);
    }

    #[tokio::test]
    async fn test_repeating_never_exhausts() {
        let backend = MockBackend::repeating(BackendTurn::Final("again".to_string()));
        for _ in 0..5 {
            match backend.turn(&[], &[]).await.unwrap() {
                BackendTurn::Final(text) => assert_eq!(text, "again"),
                other => panic!("expected final, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_records_seen_messages() {
        let backend = MockBackend::final_text("ok");
        backend
            .turn(&[ChatMessage::user("hello")], &[])
            .await
            .unwrap();
        let seen = backend.seen_messages();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0][0].content, "hello");
    }
}
