//! Bearer-token gate shared by the REST resource API and the query-graph endpoint.
//! Token lookup and verification live in sub-modules; handlers only see `AuthGate`.

mod request_token;
mod verifier;

pub use request_token::extract_token;
pub use verifier::{TokenError, TokenVerifier};

use axum::http::HeaderMap;
use tracing::warn;

use crate::error::{AppError, AppResult};

/// Stateless check applied before any entity read or write.
#[derive(Clone)]
pub struct AuthGate {
    verifier: TokenVerifier,
}

impl AuthGate {
    pub fn new(secret: &str) -> Self {
        Self { verifier: TokenVerifier::new(secret) }
    }

    /// Verify the token carried by a request (query parameter first, then header).
    pub fn check(&self, access_token: Option<&str>, headers: &HeaderMap) -> AppResult<()> {
        let token = extract_token(access_token, headers);
        self.verifier.verify(&token).map_err(|e| {
            warn!(target: "surveyd::auth", "access denied: {}", e);
            denied(&e)
        })
    }
}

/// Every token failure maps to the same 401 shape; only the reason text differs.
pub fn denied(e: &TokenError) -> AppError {
    AppError::auth("unauthorized", format!("access denied: {e}"))
}
