//! POST /query: execute a catalogued statement.
//!
//! Row-producing statements return `{"status": "success", "data": [...]}`,
//! mutations return `{"status": "success", "rows_affected": n}`.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use sqlgate_core::audit::LogRecord;
use sqlgate_core::error::ErrorClass;
use sqlgate_core::executor::{ExecutionResult, QueryRequest};

use crate::auth::RequireApiKey;
use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/query", post(run_query))
}

pub async fn run_query(
    _auth: RequireApiKey,
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<Value>, ApiError> {
    // ClientError rejections happen here, before any side effect;
    // nothing rejected by prepare() is audited.
    let prepared = state.executor().prepare(request)?;

    tracing::info!(
        user_id = %prepared.user_id(),
        query_code = %prepared.template().code,
        "processing query"
    );

    let outcome = prepared.run().await;

    // Every validated request leaves exactly one audit record, whether
    // the statement succeeded or failed at the database.
    state.audit().enqueue(LogRecord::new(
        prepared.user_id(),
        &prepared.template().code,
        &prepared.template().sql,
        prepared.params().to_vec(),
    ));

    let result = outcome.inspect_err(|err| {
        if err.class() == ErrorClass::Database {
            tracing::error!(
                user_id = %prepared.user_id(),
                query_code = %prepared.template().code,
                error = %err,
                "database query error"
            );
        }
    })?;

    let body = match result {
        ExecutionResult::Rows(rows) => json!({ "status": "success", "data": rows }),
        ExecutionResult::Affected(count) => {
            json!({ "status": "success", "rows_affected": count })
        }
    };
    Ok(Json(body))
}
