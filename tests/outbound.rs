//! Outbound calls: the answer webhook and the properties relay, each against an
//! in-process axum listener on an ephemeral port.

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Url;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use common::{app_with, config, put, send, token};
use surveyd::storage::EntityStore;

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn hook_receiver() -> (String, mpsc::UnboundedReceiver<Value>) {
    let (tx, rx) = mpsc::unbounded_channel::<Value>();
    let router = Router::new()
        .route(
            "/hook",
            post(|State(tx): State<mpsc::UnboundedSender<Value>>, Json(v): Json<Value>| async move {
                let _ = tx.send(v);
                StatusCode::OK
            }),
        )
        .with_state(tx);
    (format!("{}/hook", serve(router).await), rx)
}

#[tokio::test]
async fn answer_write_fires_webhook_with_ids() {
    let (url, mut rx) = hook_receiver().await;
    let mut cfg = config();
    cfg.answer_webhook_url = Some(Url::parse(&url).unwrap());
    let (app, _) = app_with(cfg);

    assert_eq!(put(&app, "/surveys/j", "Q1").await.status, StatusCode::NO_CONTENT);
    assert_eq!(put(&app, "/surveys/j/answers/a1", "resp").await.status, StatusCode::NO_CONTENT);

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert_eq!(event, json!({"survey": "j", "answer": "a1"}));
}

#[tokio::test]
async fn failed_answer_write_fires_nothing() {
    let (url, mut rx) = hook_receiver().await;
    let mut cfg = config();
    cfg.answer_webhook_url = Some(Url::parse(&url).unwrap());
    let (app, _) = app_with(cfg);

    assert_eq!(put(&app, "/surveys/none/answers/a1", "x").await.status, StatusCode::NOT_FOUND);
    assert!(tokio::time::timeout(Duration::from_millis(300), rx.recv()).await.is_err());
}

#[tokio::test]
async fn unreachable_webhook_does_not_affect_the_response() {
    let mut cfg = config();
    cfg.answer_webhook_url = Some(Url::parse("http://127.0.0.1:9/hook").unwrap());
    cfg.webhook_timeout = Duration::from_millis(200);
    let (app, store) = app_with(cfg);

    put(&app, "/surveys/s", "q").await;
    assert_eq!(put(&app, "/surveys/s/answers/a", "r").await.status, StatusCode::NO_CONTENT);
    assert!(store.get_answer("a").await.unwrap().is_some());
}

#[tokio::test]
async fn properties_default_to_empty_list() {
    let (app, _) = app_with(config());
    let r = send(&app, Method::GET, "/properties.json", None, Body::empty()).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(r.text(), "[]");
}

#[tokio::test]
async fn properties_are_relayed_with_the_callers_token() {
    let upstream = Router::new().route(
        "/props",
        get(|headers: HeaderMap| async move {
            let auth = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).unwrap_or("").to_string();
            Json(json!([{"name": "age", "auth": auth}]))
        }),
    );
    let base = serve(upstream).await;
    let mut cfg = config();
    cfg.properties_url = Some(Url::parse(&format!("{base}/props")).unwrap());
    let (app, _) = app_with(cfg);

    let t = token();
    let r = send(&app, Method::GET, "/properties.json", Some(&t), Body::empty()).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.json(), json!([{"name": "age", "auth": format!("Bearer {t}")}]));
}

#[tokio::test]
async fn properties_upstream_failure_is_bad_gateway() {
    let mut cfg = config();
    cfg.properties_url = Some(Url::parse("http://127.0.0.1:9/props").unwrap());
    let (app, _) = app_with(cfg);
    let r = send(&app, Method::GET, "/properties.json", None, Body::empty()).await;
    assert_eq!(r.status, StatusCode::BAD_GATEWAY);
    assert_eq!(r.json()["code"], "upstream_error");
}
