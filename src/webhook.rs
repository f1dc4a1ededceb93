//! Outbound notification fired after a successful answer write.
//!
//! Delivery is best-effort: the POST runs on a detached task with a bounded
//! timeout, failures are logged and dropped, and nothing is retried.

use std::time::Duration;

use reqwest::Url;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};

/// Body posted to the webhook URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerEvent {
    pub survey: String,
    pub answer: String,
}

#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Option<Url>,
}

impl WebhookNotifier {
    pub fn new(url: Option<Url>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::config("webhook_client", format!("cannot build webhook client: {e}")))?;
        Ok(Self { client, url })
    }

    pub fn disabled() -> Self {
        Self { client: reqwest::Client::new(), url: None }
    }

    pub fn is_enabled(&self) -> bool { self.url.is_some() }

    /// Schedule delivery and return immediately. `None` when no URL is configured.
    ///
    /// The handle is only useful to tests; request handlers drop it.
    pub fn notify_answer(&self, survey_id: &str, answer_id: &str) -> Option<JoinHandle<()>> {
        let url = self.url.clone()?;
        let client = self.client.clone();
        let event = AnswerEvent { survey: survey_id.to_string(), answer: answer_id.to_string() };
        Some(tokio::spawn(async move { deliver(client, url, event).await }))
    }
}

async fn deliver(client: reqwest::Client, url: Url, event: AnswerEvent) {
    match client.post(url).json(&event).send().await {
        Ok(resp) if resp.status().is_success() => {
            debug!(target: "surveyd::webhook", "delivered answer event survey='{}' answer='{}'", event.survey, event.answer);
        }
        Ok(resp) => {
            warn!(
                target: "surveyd::webhook",
                "webhook answered HTTP {} for survey='{}' answer='{}'", resp.status(), event.survey, event.answer
            );
        }
        Err(e) => {
            warn!(target: "surveyd::webhook", "webhook delivery failed for survey='{}' answer='{}': {}", event.survey, event.answer, e);
        }
    }
}
