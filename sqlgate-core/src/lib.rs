//! sqlgate-core: guarded SQL gateway pipeline
//!
//! Clients never send raw SQL. They send an opaque query code that is
//! resolved server-side against an immutable catalog of parameterized
//! templates, checked against a statement policy, serialized per user,
//! and executed over a bounded connection pool. Every accepted request
//! is audited through a non-blocking dispatcher that delivers records
//! to an external sink with retry/backoff.

pub mod audit;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod executor;
pub mod health;
pub mod locks;
pub mod policy;

pub use sqlx;

pub use audit::{AuditDispatcher, AuditHandle, LogRecord, LogSink, RetryPolicy, SinkError};
pub use catalog::{QueryCatalog, QueryTemplate};
pub use config::GatewayConfig;
pub use error::{CatalogError, ConfigError, ErrorClass, ExecuteError, ExecuteResult};
pub use executor::{ExecutionResult, PreparedQuery, QueryExecutor, QueryRequest};
pub use health::{HealthReporter, HealthStatus};
pub use locks::UserLockRegistry;
pub use policy::StatementPolicy;
