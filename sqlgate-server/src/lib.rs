//! sqlgate-server: HTTP front end for the guarded SQL gateway.
//!
//! A two-route axum service: `POST /query` (API-key guarded execution of
//! catalogued statements) and `GET /health` (audit-queue observability).

pub mod auth;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use auth::ApiKey;
pub use error::ApiError;
pub use server::{build_router, run_server, ServerError};
pub use state::AppState;
