//! REST resource API: get/upsert for surveys and answers.
//!
//! Every handler runs the auth gate before touching the store. A successful
//! answer upsert schedules the webhook and returns without waiting for it.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, info};

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::model::{Answer, Survey};

/// `?access_token=` is accepted on every gated route as an alternative to the header.
#[derive(Debug, Default, Deserialize)]
pub struct TokenParams {
    pub access_token: Option<String>,
}

fn body_text(body: Bytes) -> AppResult<String> {
    String::from_utf8(body.to_vec()).map_err(|_| AppError::user("invalid_body", "request body must be UTF-8 text"))
}

fn json_payload(data: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], data).into_response()
}

fn answer_not_found() -> AppError { AppError::not_found("answer_not_found", "answer not found") }

pub async fn get_survey(
    State(state): State<AppState>,
    Path(survey_id): Path<String>,
    Query(params): Query<TokenParams>,
    headers: HeaderMap,
) -> AppResult<Response> {
    state.gate.check(params.access_token.as_deref(), &headers)?;
    let survey = state
        .store
        .get_survey(&survey_id)
        .await?
        .ok_or_else(|| AppError::not_found("survey_not_found", "survey not found"))?;
    debug!(target: "surveyd::rest", "GET survey id='{}'", survey.id);
    Ok(json_payload(survey.data))
}

pub async fn put_survey(
    State(state): State<AppState>,
    Path(survey_id): Path<String>,
    Query(params): Query<TokenParams>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<StatusCode> {
    state.gate.check(params.access_token.as_deref(), &headers)?;
    let data = body_text(body)?;
    let saved = state.store.upsert_survey(Survey::new(survey_id, data)).await?;
    info!(target: "surveyd::rest", "PUT survey id='{}' bytes={}", saved.id, saved.data.len());
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_answer(
    State(state): State<AppState>,
    Path((survey_id, answer_id)): Path<(String, String)>,
    Query(params): Query<TokenParams>,
    headers: HeaderMap,
) -> AppResult<Response> {
    state.gate.check(params.access_token.as_deref(), &headers)?;
    // an answer stored under another survey is not visible through this path
    let answer = state
        .store
        .get_answer(&answer_id)
        .await?
        .filter(|a| a.survey_id == survey_id)
        .ok_or_else(answer_not_found)?;
    debug!(target: "surveyd::rest", "GET answer id='{}' survey='{}'", answer.id, answer.survey_id);
    Ok(json_payload(answer.data))
}

pub async fn put_answer(
    State(state): State<AppState>,
    Path((survey_id, answer_id)): Path<(String, String)>,
    Query(params): Query<TokenParams>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<StatusCode> {
    state.gate.check(params.access_token.as_deref(), &headers)?;
    if state.store.get_survey(&survey_id).await?.is_none() {
        return Err(answer_not_found());
    }
    let data = body_text(body)?;
    let saved = match state.store.upsert_answer(Answer::new(answer_id, data, survey_id)).await {
        Ok(a) => a,
        // survey removed between the check and the write
        Err(e) if e.is_not_found() => return Err(answer_not_found()),
        Err(e) => return Err(e),
    };
    info!(target: "surveyd::rest", "PUT answer id='{}' survey='{}' bytes={}", saved.id, saved.survey_id, saved.data.len());
    state.webhook.notify_answer(&saved.survey_id, &saved.id);
    Ok(StatusCode::NO_CONTENT)
}
