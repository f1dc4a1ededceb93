//! Read-only query graph over surveys and their answers.
//!
//! The schema is built once at startup with the entity store attached as
//! context data. Before a request reaches it, three cheap checks run on the
//! raw text: a query must be present, bracket nesting must stay under
//! `MAX_QUERY_NESTING`, and the operation must be a query.

mod types;

use async_graphql::parser::types::{DocumentOperations, OperationType};
use async_graphql::{EmptyMutation, EmptySubscription, Pos, Response, Schema, ServerError, Variables};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::storage::SharedStore;
pub use types::{AnswerNode, QueryRoot, SurveyNode};

/// Deepest selection set accepted by the executor.
pub const MAX_QUERY_DEPTH: usize = 16;
/// Deepest `{`/`[`/`(` nesting accepted in the query text, checked before parsing.
pub const MAX_QUERY_NESTING: usize = 64;

pub const MUTATIONS_REFUSED: &str = "mutations are not supported; use the REST API";
pub const SUBSCRIPTIONS_REFUSED: &str = "subscriptions are not supported";

pub type SurveySchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

/// Incoming request, from a POST body or GET query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub variables: Option<Value>,
    #[serde(default, rename = "operationName")]
    pub operation_name: Option<String>,
}

/// Envelope for a request refused before it reaches the schema.
pub fn rejected(message: impl Into<String>, pos: Option<Pos>) -> Response {
    Response::from_errors(vec![ServerError::new(message, pos)])
}

/// Shared entry point. Cloning is cheap.
#[derive(Clone)]
pub struct QueryGraph {
    schema: SurveySchema,
}

impl QueryGraph {
    pub fn new(store: SharedStore) -> Self {
        let schema = Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
            .data(store)
            .limit_depth(MAX_QUERY_DEPTH)
            .finish();
        Self { schema }
    }

    pub fn schema(&self) -> &SurveySchema { &self.schema }

    pub async fn execute(&self, req: GraphRequest) -> Response {
        let Some(query) = req.query.filter(|q| !q.trim().is_empty()) else {
            return rejected("Must provide query string.", None);
        };
        let nesting = nesting_depth(&query);
        if nesting > MAX_QUERY_NESTING {
            debug!(target: "surveyd::graph", "refused query nested {} levels deep", nesting);
            return rejected(format!("Query is nested too deeply (limit {MAX_QUERY_NESTING})."), None);
        }
        let operation_name = req.operation_name.filter(|n| !n.is_empty());
        if let Some((message, pos)) = refused_operation(&query, operation_name.as_deref()) {
            return rejected(message, Some(pos));
        }

        let mut request = async_graphql::Request::new(query);
        if let Some(name) = operation_name {
            request = request.operation_name(name);
        }
        if let Some(vars) = req.variables {
            request = request.variables(Variables::from_json(vars));
        }
        let resp = self.schema.execute(request).await;
        debug!(target: "surveyd::graph", "executed query with {} error(s)", resp.errors.len());
        resp
    }
}

/// Mutations and subscriptions get a pointed refusal instead of the schema's
/// generic one. Unparseable text passes through so the parser can report it.
fn refused_operation(query: &str, operation_name: Option<&str>) -> Option<(&'static str, Pos)> {
    let doc = async_graphql::parser::parse_query(query).ok()?;
    let op = match (&doc.operations, operation_name) {
        (DocumentOperations::Single(op), _) => op,
        (DocumentOperations::Multiple(ops), Some(name)) => ops.iter().find(|(n, _)| n.as_str() == name).map(|(_, op)| op)?,
        (DocumentOperations::Multiple(_), None) => return None,
    };
    match op.node.ty {
        OperationType::Query => None,
        OperationType::Mutation => Some((MUTATIONS_REFUSED, op.pos)),
        OperationType::Subscription => Some((SUBSCRIPTIONS_REFUSED, op.pos)),
    }
}

/// Deepest bracket nesting in the query text. String literals and comments are skipped.
fn nesting_depth(query: &str) -> usize {
    let b = query.as_bytes();
    let (mut depth, mut deepest, mut i) = (0usize, 0usize, 0usize);
    while i < b.len() {
        match b[i] {
            b'#' => {
                while i < b.len() && b[i] != b'\n' {
                    i += 1;
                }
            }
            b'"' if b[i..].starts_with(b"\"\"\"") => {
                i += 3;
                while i < b.len() && !b[i..].starts_with(b"\"\"\"") {
                    i += if b[i..].starts_with(b"\\\"\"\"") { 4 } else { 1 };
                }
                i += 2;
            }
            b'"' => {
                i += 1;
                while i < b.len() && b[i] != b'"' && b[i] != b'\n' {
                    i += if b[i] == b'\\' { 2 } else { 1 };
                }
            }
            b'{' | b'[' | b'(' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            b'}' | b']' | b')' => depth = depth.saturating_sub(1),
            _ => {}
        }
        i += 1;
    }
    deepest
}
