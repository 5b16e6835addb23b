//! Audit log records.

use chrono::{DateTime, Utc};
use chrono_tz::Asia::Tokyo;
use chrono_tz::Tz;
use serde_json::Value;

/// One audit entry, created at request completion and owned by the
/// dispatcher until delivered or dropped. Timestamps are fixed to JST
/// so log rows compare across deployments.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Tz>,
    pub user_id: String,
    pub query_code: String,
    pub sql: String,
    pub params: Vec<Value>,
}

impl LogRecord {
    pub fn new(
        user_id: impl Into<String>,
        query_code: impl Into<String>,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> Self {
        Self {
            timestamp: Utc::now().with_timezone(&Tokyo),
            user_id: user_id.into(),
            query_code: query_code.into(),
            sql: sql.into(),
            params,
        }
    }

    /// Render the sink row: [timestamp, user, code, sql, params-as-JSON].
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            self.user_id.clone(),
            self.query_code.clone(),
            self.sql.clone(),
            serde_json::to_string(&self.params).unwrap_or_else(|_| "[]".to_string()),
        ]
    }
}
