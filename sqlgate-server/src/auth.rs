//! Static API-key authentication.
//!
//! One shared secret, presented in the `x-api-key` header and compared
//! in constant time. A deployment without a configured key rejects
//! every request rather than running open.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use subtle::ConstantTimeEq;

use crate::error::ApiError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// The configured shared secret.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Constant-time comparison against a presented key.
    pub fn verify(&self, presented: &str) -> bool {
        self.0.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

impl std::fmt::Debug for ApiKey {
    // Never print the secret
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(..)")
    }
}

/// Extractor guarding authenticated routes.
#[derive(Debug)]
pub struct RequireApiKey;

impl<S> FromRequestParts<S> for RequireApiKey
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let presented = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());

        match (state.api_key(), presented) {
            (Some(key), Some(sent)) if key.verify(sent) => Ok(Self),
            _ => Err(ApiError::forbidden("invalid or missing API key")),
        }
    }
}
