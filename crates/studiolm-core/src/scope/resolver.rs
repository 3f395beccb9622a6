//! Scope resolution with fail-soft degradation

use std::sync::Arc;
use std::time::Duration;

use crate::logging::Logger;
use crate::types::ContextScope;

use super::traits::ScopeService;

/// Resolves the visibility scope for a chat request.
///
/// Resolution order:
/// 1. caller disabled scoping for this request → unscoped
/// 2. global "show everything" toggle → unscoped
/// 3. query the scoping collaborator with a short timeout; any error,
///    timeout, or "no active scope" answer → unscoped
///
/// The resolver itself is stateless; callers memoize the result per
/// request (see `chat::RequestContext`) so the collaborator is queried at
/// most once per request.
pub struct ScopeResolver {
    service: Option<Arc<dyn ScopeService>>,
    show_everything: bool,
    timeout: Duration,
    logger: Arc<dyn Logger>,
}

impl ScopeResolver {
    /// Create a resolver backed by the given collaborator
    pub fn new(service: Arc<dyn ScopeService>, timeout: Duration, logger: Arc<dyn Logger>) -> Self {
        Self {
            service: Some(service),
            show_everything: false,
            timeout,
            logger,
        }
    }

    /// Create a resolver with no collaborator: always unscoped
    pub fn disabled(logger: Arc<dyn Logger>) -> Self {
        Self {
            service: None,
            show_everything: false,
            timeout: Duration::from_secs(3),
            logger,
        }
    }

    /// Set the global "show everything" toggle
    pub fn with_show_everything(mut self, show_everything: bool) -> Self {
        self.show_everything = show_everything;
        self
    }

    /// Resolve the scope for one request
    pub async fn resolve(&self, ignore_scope: bool) -> ContextScope {
        if ignore_scope {
            self.logger
                .debug("[ScopeResolver] Scoping disabled for this request");
            return ContextScope::unscoped();
        }
        if self.show_everything {
            self.logger
                .debug("[ScopeResolver] Global show-everything toggle set");
            return ContextScope::unscoped();
        }
        let Some(service) = &self.service else {
            return ContextScope::unscoped();
        };

        match tokio::time::timeout(self.timeout, service.active_scope()).await {
            Ok(Ok(Some(active))) => {
                self.logger.debug(&format!(
                    "[ScopeResolver] Active scope {} ({} workbooks)",
                    active.scope_id,
                    active.allowed_ids.len()
                ));
                ContextScope::scoped(active.scope_id, active.allowed_ids)
            }
            Ok(Ok(None)) => {
                self.logger.debug("[ScopeResolver] No active scope");
                ContextScope::unscoped()
            }
            Ok(Err(e)) => {
                self.logger.warn(&format!(
                    "[ScopeResolver] Scope lookup failed, falling back to unscoped: {}",
                    e
                ));
                ContextScope::unscoped()
            }
            Err(_) => {
                self.logger.warn(&format!(
                    "[ScopeResolver] Scope lookup timed out after {:?}, falling back to unscoped",
                    self.timeout
                ));
                ContextScope::unscoped()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::logging::NoOpLogger;
    use crate::scope::{ActiveScope, ScopeServiceError};

    struct FixedScopeService {
        calls: AtomicU32,
        response: Option<ActiveScope>,
    }

    #[async_trait]
    impl ScopeService for FixedScopeService {
        async fn active_scope(&self) -> Result<Option<ActiveScope>, ScopeServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    struct FailingScopeService;

    #[async_trait]
    impl ScopeService for FailingScopeService {
        async fn active_scope(&self) -> Result<Option<ActiveScope>, ScopeServiceError> {
            Err(ScopeServiceError::Unavailable("connection refused".into()))
        }
    }

    struct SlowScopeService;

    #[async_trait]
    impl ScopeService for SlowScopeService {
        async fn active_scope(&self) -> Result<Option<ActiveScope>, ScopeServiceError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(None)
        }
    }

    fn logger() -> Arc<dyn Logger> {
        Arc::new(NoOpLogger::new())
    }

    #[tokio::test]
    async fn test_resolves_active_scope() {
        let service = Arc::new(FixedScopeService {
            calls: AtomicU32::new(0),
            response: Some(ActiveScope {
                scope_id: "ctx-1".to_string(),
                allowed_ids: vec!["wbA".to_string()],
            }),
        });
        let resolver = ScopeResolver::new(service, Duration::from_secs(3), logger());

        let scope = resolver.resolve(false).await;
        assert_eq!(scope.context_id.as_deref(), Some("ctx-1"));
        assert!(scope.allows("wbA"));
        assert!(!scope.allows("wbB"));
    }

    #[tokio::test]
    async fn test_ignore_scope_skips_service() {
        let service = Arc::new(FixedScopeService {
            calls: AtomicU32::new(0),
            response: None,
        });
        let resolver = ScopeResolver::new(service.clone(), Duration::from_secs(3), logger());

        let scope = resolver.resolve(true).await;
        assert!(scope.is_unscoped());
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_show_everything_skips_service() {
        let service = Arc::new(FixedScopeService {
            calls: AtomicU32::new(0),
            response: None,
        });
        let resolver = ScopeResolver::new(service.clone(), Duration::from_secs(3), logger())
            .with_show_everything(true);

        assert!(resolver.resolve(false).await.is_unscoped());
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_error_degrades_to_unscoped() {
        let resolver =
            ScopeResolver::new(Arc::new(FailingScopeService), Duration::from_secs(3), logger());
        assert!(resolver.resolve(false).await.is_unscoped());
    }

    #[tokio::test]
    async fn test_timeout_degrades_to_unscoped() {
        let resolver =
            ScopeResolver::new(Arc::new(SlowScopeService), Duration::from_millis(20), logger());
        assert!(resolver.resolve(false).await.is_unscoped());
    }

    #[tokio::test]
    async fn test_no_active_scope_is_unscoped() {
        let service = Arc::new(FixedScopeService {
            calls: AtomicU32::new(0),
            response: None,
        });
        let resolver = ScopeResolver::new(service, Duration::from_secs(3), logger());
        assert!(resolver.resolve(false).await.is_unscoped());
    }
}
