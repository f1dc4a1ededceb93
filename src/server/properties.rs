use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::rest::TokenParams;
use super::AppState;
use crate::error::{AppError, AppResult};
use crate::identity::extract_token;

/// Relay the property catalogue used by the survey editor.
///
/// Without a configured upstream the catalogue is empty. The caller's bearer
/// token is forwarded as-is; this route does not verify it itself.
pub async fn properties(
    State(state): State<AppState>,
    Query(params): Query<TokenParams>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let json = [(header::CONTENT_TYPE, "application/json")];
    let Some(url) = state.properties_url.clone() else {
        return Ok((json, "[]").into_response());
    };
    let token = extract_token(params.access_token.as_deref(), &headers);
    let upstream_failed = |e: String| {
        warn!(target: "surveyd::rest", "properties upstream failed: {}", e);
        AppError::upstream("upstream_error", "properties source unavailable")
    };
    let resp = state.http.get(url).bearer_auth(token).send().await.map_err(|e| upstream_failed(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(upstream_failed(format!("HTTP {}", resp.status())));
    }
    let body = resp.bytes().await.map_err(|e| upstream_failed(e.to_string()))?;
    Ok((json, body).into_response())
}
