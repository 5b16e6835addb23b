//! sqlgate: guarded SQL gateway server.
//!
//! Startup order: dotenv → tracing → config → catalog → pool (fail fast)
//! → audit dispatcher → serve. On shutdown the audit queue is closed and
//! pending records get a bounded drain window.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sqlgate_core::audit::{AuditDispatcher, LogSink, RetryPolicy, SheetsSink, TracingSink};
use sqlgate_core::catalog::QueryCatalog;
use sqlgate_core::config::GatewayConfig;
use sqlgate_core::db::create_pool;
use sqlgate_core::executor::QueryExecutor;
use sqlgate_core::locks::UserLockRegistry;
use sqlgate_core::policy::StatementPolicy;
use sqlgate_server::auth::ApiKey;
use sqlgate_server::server::run_server;
use sqlgate_server::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "sqlgate", about = "Guarded gateway between query codes and a MySQL database")]
struct Args {
    /// Path to the gateway configuration file
    #[arg(long, default_value = "sqlgate.toml")]
    config: PathBuf,

    /// Override the configured bind address
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Enable debug logging (RUST_LOG still wins if set)
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.debug)?;

    let config = GatewayConfig::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;

    let policy = StatementPolicy::new(config.policy.denied_verbs.clone());
    let catalog = QueryCatalog::load(&config.catalog.path, &policy)
        .with_context(|| format!("failed to load catalog from {}", config.catalog.path.display()))?;
    tracing::info!(templates = catalog.len(), "query catalog loaded");

    let database_url = config.database_url()?;
    let pool = create_pool(
        &database_url,
        config.database.max_connections,
        config.database.acquire_timeout(),
    )
    .await
    .context("failed to connect to the database")?;
    tracing::info!(
        max_connections = config.database.max_connections,
        "database pool ready"
    );

    let sink = build_sink(&config)?;
    let retry = RetryPolicy {
        max_attempts: config.audit.max_attempts,
        base_delay: std::time::Duration::from_millis(config.audit.base_delay_ms),
        max_delay: std::time::Duration::from_millis(config.audit.max_delay_ms),
        jitter: std::time::Duration::from_millis(config.audit.jitter_ms),
    };
    let dispatcher = AuditDispatcher::spawn(
        sink,
        config.audit.queue_depth,
        config.audit.workers,
        retry,
    );

    let api_key = std::env::var("SQLGATE_API_KEY").ok().map(ApiKey::new);
    if api_key.is_none() {
        tracing::warn!("SQLGATE_API_KEY is not set; every request will be rejected");
    }

    let executor = QueryExecutor::new(
        catalog,
        policy,
        UserLockRegistry::new(config.locks.acquire_timeout()),
        pool,
    );
    let state = AppState::new(executor, dispatcher.handle(), api_key);

    let bind_addr = match args.bind {
        Some(addr) => addr,
        None => config
            .server
            .bind
            .parse()
            .with_context(|| format!("invalid bind address '{}'", config.server.bind))?,
    };

    run_server(state, bind_addr).await?;

    tracing::info!("draining audit queue");
    dispatcher.shutdown(config.audit.shutdown_drain()).await;

    Ok(())
}

fn build_sink(config: &GatewayConfig) -> Result<Arc<dyn LogSink>> {
    if let Some(sheets) = &config.audit.sheets {
        match std::env::var("SQLGATE_SHEETS_TOKEN") {
            Ok(token) if !token.is_empty() => {
                let sink = SheetsSink::new(
                    &sheets.spreadsheet_id,
                    &sheets.range,
                    token,
                    config.audit.attempt_timeout(),
                )
                .context("failed to build sheets client")?;
                tracing::info!(spreadsheet = %sheets.spreadsheet_id, "audit sink: google sheets");
                return Ok(Arc::new(sink));
            }
            _ => {
                // Degrade to the local sink rather than refuse to start
                tracing::warn!(
                    "audit.sheets configured but SQLGATE_SHEETS_TOKEN is unset; \
                     falling back to the tracing sink"
                );
            }
        }
    }
    tracing::info!("audit sink: tracing");
    Ok(Arc::new(TracingSink))
}

fn init_tracing(debug: bool) -> Result<()> {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(debug)
        .compact()
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))
}
