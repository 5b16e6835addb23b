//! Application state shared across handlers.

use std::sync::Arc;

use sqlgate_core::audit::AuditHandle;
use sqlgate_core::executor::QueryExecutor;
use sqlgate_core::health::HealthReporter;

use crate::auth::ApiKey;

/// Shared service context. Every collaborator is constructed explicitly
/// and injected, so tests assemble isolated states.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    executor: QueryExecutor,
    audit: AuditHandle,
    health: HealthReporter,
    api_key: Option<ApiKey>,
}

impl AppState {
    pub fn new(executor: QueryExecutor, audit: AuditHandle, api_key: Option<ApiKey>) -> Self {
        let health = audit.reporter();
        Self {
            inner: Arc::new(AppStateInner {
                executor,
                audit,
                health,
                api_key,
            }),
        }
    }

    pub fn executor(&self) -> &QueryExecutor {
        &self.inner.executor
    }

    pub fn audit(&self) -> &AuditHandle {
        &self.inner.audit
    }

    pub fn health(&self) -> &HealthReporter {
        &self.inner.health
    }

    /// `None` means no key is configured and all requests are rejected.
    pub fn api_key(&self) -> Option<&ApiKey> {
        self.inner.api_key.as_ref()
    }
}
