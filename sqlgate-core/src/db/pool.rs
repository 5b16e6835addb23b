//! Bounded MySQL connection pool.
//!
//! sqlx's pool provides the gateway's checkout discipline: at most
//! `max_connections` connections are out at once, waiters queue FIFO up
//! to `acquire_timeout`, and `test_before_acquire` transparently
//! re-establishes connections the server dropped while idle.

use std::time::Duration;

use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;

use crate::error::ExecuteError;

/// Create a MySQL pool, dialing the database immediately.
///
/// Used at startup so a bad URL or unreachable database fails fast
/// instead of on the first request.
pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<MySqlPool, sqlx::Error> {
    pool_options(max_connections, acquire_timeout)
        .connect(database_url)
        .await
}

/// Create a pool that connects on first acquire.
///
/// Validation-failure paths never touch it, which keeps rejection tests
/// runnable without a database.
pub fn create_pool_lazy(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<MySqlPool, sqlx::Error> {
    pool_options(max_connections, acquire_timeout).connect_lazy(database_url)
}

fn pool_options(max_connections: u32, acquire_timeout: Duration) -> MySqlPoolOptions {
    MySqlPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .test_before_acquire(true)
}

/// Map a pool acquire failure onto the gateway taxonomy.
///
/// An exhausted pool is resource exhaustion (retryable by the caller);
/// anything else is a database error.
pub fn map_acquire_error(err: sqlx::Error, waited: Duration) -> ExecuteError {
    match err {
        sqlx::Error::PoolTimedOut => ExecuteError::PoolExhausted { waited },
        other => ExecuteError::Database(other),
    }
}
