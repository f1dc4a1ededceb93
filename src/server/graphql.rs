//! `/graphql` transport: decode the request, run the gate, hand off to the query graph.
//! The envelope is always returned with HTTP 200 once the gate has passed.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use super::rest::TokenParams;
use super::AppState;
use crate::error::{AppError, AppResult};
use crate::graph::{rejected, GraphRequest};

#[derive(Debug, Default, Deserialize)]
pub struct GraphParams {
    pub query: Option<String>,
    /// JSON-encoded object.
    pub variables: Option<String>,
    #[serde(rename = "operationName")]
    pub operation_name: Option<String>,
    pub access_token: Option<String>,
}

pub async fn graphql_get(
    State(state): State<AppState>,
    Query(params): Query<GraphParams>,
    headers: HeaderMap,
) -> AppResult<Response> {
    state.gate.check(params.access_token.as_deref(), &headers)?;
    let variables = match params.variables.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        None => None,
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(v) => Some(v),
            Err(e) => {
                return Ok(Json(rejected(format!("Variables are invalid JSON: {e}"), None)).into_response());
            }
        },
    };
    let req = GraphRequest { query: params.query, variables, operation_name: params.operation_name };
    Ok(Json(state.graph.execute(req).await).into_response())
}

pub async fn graphql_post(
    State(state): State<AppState>,
    Query(params): Query<TokenParams>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    state.gate.check(params.access_token.as_deref(), &headers)?;
    let req: GraphRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::user("invalid_body", format!("request body is not a JSON query object: {e}")))?;
    Ok(Json(state.graph.execute(req).await).into_response())
}
