//! Audit sinks.
//!
//! A sink appends one row per record and classifies its failures:
//! transient failures are retry-eligible, permanent ones are not.
//! [`SheetsSink`] targets the Google Sheets v4 append endpoint;
//! [`TracingSink`] is the credential-free default.

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use super::record::LogRecord;

/// Sink failure, classified for retry eligibility.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Worth retrying: rate limits, 5xx, transport or timeout failures
    #[error("transient sink failure: {0}")]
    Transient(String),

    /// Not worth retrying: bad credentials, malformed range, other 4xx
    #[error("permanent sink failure: {0}")]
    Permanent(String),
}

impl SinkError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Append-only tabular log sink.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn append(&self, record: &LogRecord) -> Result<(), SinkError>;
}

/// Default sink: writes the row to the process log. Lets the gateway run
/// without Google credentials.
#[derive(Debug, Default)]
pub struct TracingSink;

#[async_trait]
impl LogSink for TracingSink {
    async fn append(&self, record: &LogRecord) -> Result<(), SinkError> {
        let row = record.to_row();
        tracing::info!(
            timestamp = %row[0],
            user_id = %row[1],
            query_code = %row[2],
            params = %row[4],
            "audit"
        );
        Ok(())
    }
}

/// Google Sheets `values:append` sink.
///
/// The bearer token is supplied pre-acquired; credential acquisition is
/// out of scope here.
pub struct SheetsSink {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl SheetsSink {
    pub fn new(
        spreadsheet_id: &str,
        range: &str,
        token: String,
        attempt_timeout: std::time::Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(attempt_timeout).build()?;
        Ok(Self {
            client,
            url: format!(
                "https://sheets.googleapis.com/v4/spreadsheets/{spreadsheet_id}/values/{range}:append"
            ),
            token,
        })
    }
}

#[async_trait]
impl LogSink for SheetsSink {
    async fn append(&self, record: &LogRecord) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "values": [record.to_row()] }))
            .send()
            .await
            // Connect/timeout failures are transport-level and transient
            .map_err(|err| SinkError::Transient(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        let reason = format!("sheets append returned {status}: {detail}");
        if status == reqwest::StatusCode::REQUEST_TIMEOUT
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status.is_server_error()
        {
            Err(SinkError::Transient(reason))
        } else {
            Err(SinkError::Permanent(reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(SinkError::Transient("429".into()).is_transient());
        assert!(!SinkError::Permanent("401".into()).is_transient());
    }

    #[tokio::test]
    async fn tracing_sink_always_succeeds() {
        let record = LogRecord::new("u1", "code", "SELECT 1", vec![]);
        assert!(TracingSink.append(&record).await.is_ok());
    }
}
