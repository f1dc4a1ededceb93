//! Shared fixtures for the HTTP integration tests: token minting and a
//! oneshot driver over the full router.

#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, EncodingKey, Header};
use tower::ServiceExt;

use surveyd::config::ServiceConfig;
use surveyd::server::{build_router, AppState};
use surveyd::storage::SharedStore;

pub const SECRET: &str = "integration-secret";

pub fn token_for(secret: &str) -> String {
    let claims = serde_json::json!({"sub": "tester", "exp": chrono::Utc::now().timestamp() + 600});
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}

pub fn token() -> String { token_for(SECRET) }

/// Token whose header names `alg`, with a junk signature.
pub fn forged_token(alg: &str) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    let header = URL_SAFE_NO_PAD.encode(serde_json::json!({"alg": alg, "typ": "JWT"}).to_string());
    let payload = URL_SAFE_NO_PAD.encode(serde_json::json!({"sub": "tester"}).to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

pub fn config() -> ServiceConfig {
    ServiceConfig { jwt_secret: SECRET.to_string(), ..ServiceConfig::default() }
}

pub fn app_with(cfg: ServiceConfig) -> (Router, SharedStore) {
    let store = SharedStore::memory();
    let state = AppState::new(store.clone(), &cfg).unwrap();
    (build_router(state), store)
}

pub fn app() -> (Router, SharedStore) { app_with(config()) }

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Reply {
    pub fn text(&self) -> String { String::from_utf8(self.body.to_vec()).unwrap() }
    pub fn json(&self) -> serde_json::Value { serde_json::from_slice(&self.body).unwrap() }
}

/// Send one request through the router. `bearer` goes into the Authorization header.
pub async fn send(app: &Router, method: Method, uri: &str, bearer: Option<&str>, body: impl Into<Body>) -> Reply {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = bearer {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let resp = app.clone().oneshot(req.body(body.into()).unwrap()).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    Reply { status, headers, body }
}

pub async fn get(app: &Router, uri: &str) -> Reply {
    send(app, Method::GET, uri, Some(&token()), Body::empty()).await
}

pub async fn put(app: &Router, uri: &str, body: &str) -> Reply {
    send(app, Method::PUT, uri, Some(&token()), body.to_string()).await
}
