//! Structured error types for sqlgate-core.
//!
//! Uses `thiserror` for composable library errors. The server crate maps
//! these onto HTTP responses; the binary uses `anyhow` at the edges.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for execution-path operations
pub type ExecuteResult<T> = std::result::Result<T, ExecuteError>;

/// Broad failure classes surfaced to callers.
///
/// Client errors are rejections with no side effects and should not be
/// retried as-is. Resource exhaustion is transient and safe to retry later.
/// Database errors ran against (or while reaching) the backend and are never
/// retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Client,
    ResourceExhaustion,
    Database,
    Internal,
}

/// Errors produced by the query execution pipeline
#[derive(Error, Debug)]
pub enum ExecuteError {
    /// Query code is not present in the catalog
    #[error("unknown query code '{code}'")]
    UnknownQueryCode { code: String },

    /// Resolved template's statement verb is denylisted
    #[error("statement verb '{verb}' is blocked by policy")]
    ForbiddenStatement { verb: String },

    /// Placeholder count does not match the supplied parameter count
    #[error("template expects {expected} parameter(s), got {supplied}")]
    ParameterMismatch { expected: usize, supplied: usize },

    /// A parameter is not a scalar value
    #[error("parameter {index} is not a scalar value")]
    InvalidParameter { index: usize },

    /// Another request for the same user held the lock past the wait bound
    #[error("timed out after {waited:?} waiting for user '{user_id}' lock")]
    LockTimeout { user_id: String, waited: Duration },

    /// All pooled connections stayed busy past the acquire timeout
    #[error("connection pool exhausted (waited {waited:?})")]
    PoolExhausted { waited: Duration },

    /// Driver-level failure (connectivity, constraint violation, bad SQL)
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Execution task failed outside the database path
    #[error("internal execution failure: {reason}")]
    Internal { reason: String },
}

impl ExecuteError {
    /// Classify this error per the gateway's error taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownQueryCode { .. }
            | Self::ForbiddenStatement { .. }
            | Self::ParameterMismatch { .. }
            | Self::InvalidParameter { .. } => ErrorClass::Client,
            Self::LockTimeout { .. } | Self::PoolExhausted { .. } => {
                ErrorClass::ResourceExhaustion
            }
            Self::Database(_) => ErrorClass::Database,
            Self::Internal { .. } => ErrorClass::Internal,
        }
    }

    /// Create an unknown-query-code error
    pub fn unknown_code(code: impl Into<String>) -> Self {
        Self::UnknownQueryCode { code: code.into() }
    }

    /// Create an internal execution error
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }
}

/// Errors raised while loading the query catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse catalog file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("template '{code}' has an empty SQL body")]
    EmptyTemplate { code: String },
}

/// Errors raised while loading gateway configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
