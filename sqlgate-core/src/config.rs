//! Gateway configuration loaded from a TOML file at startup.
//!
//! Secrets never live in the file: `DATABASE_URL` overrides
//! `[database].url`, and the API key and sheets token come only from
//! the environment (`SQLGATE_API_KEY`, `SQLGATE_SHEETS_TOKEN`).

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub locks: LocksConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection string; DATABASE_URL takes precedence
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
            acquire_timeout_ms: 5_000,
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("queries.toml"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocksConfig {
    /// Bound on waiting for a user's lock, in milliseconds.
    /// 0 selects an unbounded wait.
    pub acquire_timeout_ms: u64,
}

impl Default for LocksConfig {
    fn default() -> Self {
        Self {
            acquire_timeout_ms: 10_000,
        }
    }
}

impl LocksConfig {
    pub fn acquire_timeout(&self) -> Option<Duration> {
        if self.acquire_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.acquire_timeout_ms))
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub denied_verbs: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            denied_verbs: vec!["delete".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Bounded queue capacity; records beyond it are dropped, not blocked on
    pub queue_depth: usize,
    pub workers: usize,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ms: u64,
    pub attempt_timeout_ms: u64,
    /// Drain window granted to pending records at shutdown
    pub shutdown_drain_ms: u64,
    pub sheets: Option<SheetsConfig>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            queue_depth: 256,
            workers: 1,
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter_ms: 250,
            attempt_timeout_ms: 10_000,
            shutdown_drain_ms: 5_000,
            sheets: None,
        }
    }
}

impl AuditConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn shutdown_drain(&self) -> Duration {
        Duration::from_millis(self.shutdown_drain_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    #[serde(default = "default_sheets_range")]
    pub range: String,
}

fn default_sheets_range() -> String {
    "Sheet1!A:E".to_string()
}

impl GatewayConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                field: "database.max_connections",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.audit.queue_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "audit.queue_depth",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.audit.workers == 0 {
            return Err(ConfigError::Invalid {
                field: "audit.workers",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.audit.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "audit.max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        // Keeps backoff delays monotonically non-decreasing across attempts
        if self.audit.jitter_ms > self.audit.base_delay_ms {
            return Err(ConfigError::Invalid {
                field: "audit.jitter_ms",
                reason: "must not exceed audit.base_delay_ms".to_string(),
            });
        }
        Ok(())
    }

    /// Resolve the database URL: environment first, then the config file.
    pub fn database_url(&self) -> Result<String, ConfigError> {
        if let Ok(url) = env::var("DATABASE_URL") {
            if !url.is_empty() {
                return Ok(url);
            }
        }
        self.database
            .url
            .clone()
            .ok_or_else(|| ConfigError::Invalid {
                field: "database.url",
                reason: "not set and DATABASE_URL is not in the environment".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_sections() {
        let config = GatewayConfig::from_toml_str("").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.locks.acquire_timeout_ms, 10_000);
        assert_eq!(config.policy.denied_verbs, vec!["delete"]);
        assert_eq!(config.audit.queue_depth, 256);
        assert!(config.audit.sheets.is_none());
    }

    #[test]
    fn parses_full_file() {
        let config = GatewayConfig::from_toml_str(
            r#"
[server]
bind = "0.0.0.0:9000"

[database]
url = "mysql://gate:pw@db/app"
max_connections = 12
acquire_timeout_ms = 2000

[catalog]
path = "conf/queries.toml"

[locks]
acquire_timeout_ms = 0

[policy]
denied_verbs = ["delete", "drop", "truncate"]

[audit]
queue_depth = 64
max_attempts = 3

[audit.sheets]
spreadsheet_id = "abc123"
"#,
        )
        .unwrap();

        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.database.max_connections, 12);
        assert_eq!(config.locks.acquire_timeout(), None);
        assert_eq!(config.policy.denied_verbs.len(), 3);
        let sheets = config.audit.sheets.unwrap();
        assert_eq!(sheets.spreadsheet_id, "abc123");
        assert_eq!(sheets.range, "Sheet1!A:E");
    }

    #[test]
    fn zero_pool_size_is_invalid() {
        let err = GatewayConfig::from_toml_str("[database]\nmax_connections = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "database.max_connections",
                ..
            }
        ));
    }

    #[test]
    fn oversized_jitter_is_invalid() {
        let err = GatewayConfig::from_toml_str(
            "[audit]\nbase_delay_ms = 100\njitter_ms = 500",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn bounded_lock_wait_by_default() {
        let config = GatewayConfig::from_toml_str("").unwrap();
        assert_eq!(
            config.locks.acquire_timeout(),
            Some(Duration::from_secs(10))
        );
    }
}
