//! Postgres-backed entity store.
//!
//! Tables are created on connect when missing. A single `tokio_postgres::Client`
//! is shared by every request task; the client pipelines concurrent queries over
//! its connection, which is driven by a background task.

use async_trait::async_trait;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error, info};

use crate::error::{AppError, AppResult};
use crate::model::{Answer, Survey};

use super::{answer_owned_elsewhere, survey_missing, EntityStore};

const MIGRATION: &str = "
CREATE TABLE IF NOT EXISTS surveys (
    uid        TEXT PRIMARY KEY,
    data       TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE TABLE IF NOT EXISTS answers (
    uid        TEXT PRIMARY KEY,
    data       TEXT NOT NULL,
    survey_uid TEXT NOT NULL REFERENCES surveys (uid),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS answers_survey_uid_idx ON answers (survey_uid);
";

pub struct PgStore {
    client: Client,
}

impl PgStore {
    pub async fn connect(url: &str) -> AppResult<Self> {
        let (client, conn) = tokio_postgres::connect(url, NoTls).await.map_err(|e| store_failure("connect", e))?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                error!(target: "surveyd::storage", "postgres connection closed: {e}");
            }
        });
        let store = Self { client };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> AppResult<()> {
        self.client.batch_execute(MIGRATION).await.map_err(|e| store_failure("migrate", e))?;
        info!(target: "surveyd::storage", "postgres schema ready (surveys, answers)");
        Ok(())
    }
}

fn store_failure(op: &str, e: tokio_postgres::Error) -> AppError {
    error!(target: "surveyd::storage", "postgres {op} failed: {e}");
    AppError::store("store_error", format!("{op} failed: {e}"))
}

fn survey_from_row(row: &Row) -> Survey {
    Survey { id: row.get(0), data: row.get(1) }
}

fn answer_from_row(row: &Row) -> Answer {
    Answer { id: row.get(0), data: row.get(1), survey_id: row.get(2) }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn get_survey(&self, id: &str) -> AppResult<Option<Survey>> {
        let row = self
            .client
            .query_opt("SELECT uid, data FROM surveys WHERE uid = $1", &[&id])
            .await
            .map_err(|e| store_failure("get_survey", e))?;
        Ok(row.as_ref().map(survey_from_row))
    }

    async fn upsert_survey(&self, survey: Survey) -> AppResult<Survey> {
        self.client
            .execute(
                "INSERT INTO surveys (uid, data) VALUES ($1, $2) \
                 ON CONFLICT (uid) DO UPDATE SET data = EXCLUDED.data, updated_at = now()",
                &[&survey.id, &survey.data],
            )
            .await
            .map_err(|e| store_failure("upsert_survey", e))?;
        debug!(target: "surveyd::storage", "pg upsert survey id='{}'", survey.id);
        Ok(survey)
    }

    async fn list_surveys(&self) -> AppResult<Vec<Survey>> {
        let rows = self
            .client
            .query("SELECT uid, data FROM surveys ORDER BY uid", &[])
            .await
            .map_err(|e| store_failure("list_surveys", e))?;
        Ok(rows.iter().map(survey_from_row).collect())
    }

    async fn get_answer(&self, id: &str) -> AppResult<Option<Answer>> {
        let row = self
            .client
            .query_opt("SELECT uid, data, survey_uid FROM answers WHERE uid = $1", &[&id])
            .await
            .map_err(|e| store_failure("get_answer", e))?;
        Ok(row.as_ref().map(answer_from_row))
    }

    async fn upsert_answer(&self, answer: Answer) -> AppResult<Answer> {
        // The conditional update leaves an answer owned by another survey untouched
        // and returns no row, which is reported as a conflict below.
        let written = self
            .client
            .query_opt(
                "INSERT INTO answers (uid, data, survey_uid) VALUES ($1, $2, $3) \
                 ON CONFLICT (uid) DO UPDATE SET data = EXCLUDED.data, updated_at = now() \
                 WHERE answers.survey_uid = EXCLUDED.survey_uid \
                 RETURNING uid",
                &[&answer.id, &answer.data, &answer.survey_id],
            )
            .await;
        match written {
            Ok(Some(_)) => {
                debug!(target: "surveyd::storage", "pg upsert answer id='{}' survey='{}'", answer.id, answer.survey_id);
                Ok(answer)
            }
            Ok(None) => {
                let owner: Option<String> = self
                    .client
                    .query_opt("SELECT survey_uid FROM answers WHERE uid = $1", &[&answer.id])
                    .await
                    .map_err(|e| store_failure("upsert_answer", e))?
                    .map(|r| r.get(0));
                Err(answer_owned_elsewhere(&answer.id, owner.as_deref().unwrap_or("?")))
            }
            Err(e) if e.code() == Some(&SqlState::FOREIGN_KEY_VIOLATION) => Err(survey_missing(&answer.survey_id)),
            Err(e) => Err(store_failure("upsert_answer", e)),
        }
    }

    async fn list_answers_by_survey(&self, survey_id: &str) -> AppResult<Vec<Answer>> {
        let rows = self
            .client
            .query(
                "SELECT uid, data, survey_uid FROM answers WHERE survey_uid = $1 ORDER BY uid",
                &[&survey_id],
            )
            .await
            .map_err(|e| store_failure("list_answers_by_survey", e))?;
        Ok(rows.iter().map(answer_from_row).collect())
    }
}
