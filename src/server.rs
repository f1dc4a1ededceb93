//!
//! surveyd HTTP server
//! -------------------
//! This module defines the Axum router that exposes surveys and answers over two
//! protocols sharing one entity store: the REST resource API and the read-only
//! query graph at `/graphql`.
//!
//! Responsibilities:
//! - Building the shared `AppState` (store handle, auth gate, webhook notifier,
//!   query graph schema, properties proxy client) from a resolved `ServiceConfig`.
//! - Mounting every route with the same auth gate in front of entity access.
//! - Startup logging of the effective configuration, secret redacted.

use std::net::SocketAddr;

use anyhow::Context;
use axum::routing::get;
use axum::Router;
use reqwest::Url;
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::error::{AppError, AppResult};
use crate::graph::QueryGraph;
use crate::identity::AuthGate;
use crate::storage::{open_store, SharedStore};
use crate::webhook::WebhookNotifier;

pub mod graphql;
pub mod properties;
pub mod rest;

/// Shared server state injected into all handlers. Every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub gate: AuthGate,
    pub webhook: WebhookNotifier,
    /// Query graph schema, built once with the store attached.
    pub graph: QueryGraph,
    /// Upstream for `/properties.json`; `None` answers an empty list.
    pub properties_url: Option<Url>,
    pub http: reqwest::Client,
}

impl AppState {
    /// Assemble the state around an already opened store.
    pub fn new(store: SharedStore, cfg: &ServiceConfig) -> AppResult<Self> {
        let graph = QueryGraph::new(store.clone());
        let webhook = WebhookNotifier::new(cfg.answer_webhook_url.clone(), cfg.webhook_timeout)?;
        let http = reqwest::Client::builder()
            .timeout(cfg.properties_timeout)
            .build()
            .map_err(|e| AppError::config("http_client", format!("cannot build outbound HTTP client: {e}")))?;
        Ok(Self {
            store,
            gate: AuthGate::new(&cfg.jwt_secret),
            webhook,
            graph,
            properties_url: cfg.properties_url.clone(),
            http,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "surveyd ok" }))
        .route("/surveys/{survey_id}", get(rest::get_survey).put(rest::put_survey))
        .route("/surveys/{survey_id}/answers/{answer_id}", get(rest::get_answer).put(rest::put_answer))
        .route("/graphql", get(graphql::graphql_get).post(graphql::graphql_post))
        .route("/properties.json", get(properties::properties))
        .with_state(state)
}

/// Open the store named by `cfg`, build the router and serve until the listener fails.
pub async fn run_with_config(cfg: ServiceConfig) -> anyhow::Result<()> {
    info!(target: "surveyd::startup", "surveyd starting: {}", cfg.redacted_summary());
    if cfg.uses_default_secret() {
        warn!(
            target: "surveyd::startup",
            "JWT_SECRET is unset; tokens are verified against the built-in placeholder secret"
        );
    }
    let store = open_store(&cfg.database_url)
        .await
        .with_context(|| format!("While opening entity store for {}", cfg.redacted_summary()))?;
    let state = AppState::new(store, &cfg)?;
    if !state.webhook.is_enabled() {
        info!(target: "surveyd::startup", "answer webhook disabled");
    }
    let app = build_router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.http_port).parse()?;
    info!(target: "surveyd::startup", "Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
