//! SQLite-backed entity store.
//!
//! Accepts `sqlite3://:memory:`, `sqlite3://relative/path.db` and
//! `sqlite3:///absolute/path.db` (`sqlite://` works the same). One connection
//! behind a mutex; every call runs on the blocking pool.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, error, info};

use crate::error::{AppError, AppResult};
use crate::model::{Answer, Survey};

use super::{answer_owned_elsewhere, survey_missing, EntityStore};

const MIGRATION: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS surveys (
    uid        TEXT PRIMARY KEY,
    data       TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS answers (
    uid        TEXT PRIMARY KEY,
    data       TEXT NOT NULL,
    survey_uid TEXT NOT NULL REFERENCES surveys (uid),
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS answers_survey_uid_idx ON answers (survey_uid);
"#;

/// Result of the answer write transaction.
enum AnswerWrite {
    Written,
    NoSurvey,
    OwnedBy(String),
}

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open the database named by a `sqlite3://` / `sqlite://` URL and create missing tables.
    pub fn open(url: &str) -> AppResult<Self> {
        let path = url
            .split_once("://")
            .map(|(_, rest)| rest)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::config("invalid_database_url", format!("sqlite URL has no path: {url}")))?;
        let conn = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(|e| store_failure("open", e))?;
        conn.execute_batch(MIGRATION).map_err(|e| store_failure("migrate", e))?;
        info!(target: "surveyd::storage", "sqlite schema ready at {} (surveys, answers)", path);
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    async fn with_conn<T, F>(&self, op: &'static str, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let res = tokio::task::spawn_blocking(move || f(&mut conn.lock()))
            .await
            .map_err(|e| AppError::internal("store_task", format!("{op} task failed: {e}")))?;
        res.map_err(|e| store_failure(op, e))
    }
}

fn store_failure(op: &str, e: rusqlite::Error) -> AppError {
    error!(target: "surveyd::storage", "sqlite {op} failed: {e}");
    AppError::store("store_error", format!("{op} failed: {e}"))
}

fn survey_from_row(row: &Row<'_>) -> rusqlite::Result<Survey> {
    Ok(Survey { id: row.get(0)?, data: row.get(1)? })
}

fn answer_from_row(row: &Row<'_>) -> rusqlite::Result<Answer> {
    Ok(Answer { id: row.get(0)?, data: row.get(1)?, survey_id: row.get(2)? })
}

#[async_trait]
impl EntityStore for SqliteStore {
    async fn get_survey(&self, id: &str) -> AppResult<Option<Survey>> {
        let id = id.to_string();
        self.with_conn("get_survey", move |c| {
            c.query_row("SELECT uid, data FROM surveys WHERE uid = ?1", params![id], survey_from_row).optional()
        })
        .await
    }

    async fn upsert_survey(&self, survey: Survey) -> AppResult<Survey> {
        let (id, data) = (survey.id.clone(), survey.data.clone());
        self.with_conn("upsert_survey", move |c| {
            c.execute(
                "INSERT INTO surveys (uid, data) VALUES (?1, ?2) \
                 ON CONFLICT (uid) DO UPDATE SET data = excluded.data, updated_at = CURRENT_TIMESTAMP",
                params![id, data],
            )
        })
        .await?;
        debug!(target: "surveyd::storage", "sqlite upsert survey id='{}'", survey.id);
        Ok(survey)
    }

    async fn list_surveys(&self) -> AppResult<Vec<Survey>> {
        self.with_conn("list_surveys", |c| {
            let mut stmt = c.prepare("SELECT uid, data FROM surveys ORDER BY uid")?;
            let rows = stmt.query_map([], survey_from_row)?;
            rows.collect()
        })
        .await
    }

    async fn get_answer(&self, id: &str) -> AppResult<Option<Answer>> {
        let id = id.to_string();
        self.with_conn("get_answer", move |c| {
            c.query_row("SELECT uid, data, survey_uid FROM answers WHERE uid = ?1", params![id], answer_from_row)
                .optional()
        })
        .await
    }

    async fn upsert_answer(&self, answer: Answer) -> AppResult<Answer> {
        let (id, data, survey_id) = (answer.id.clone(), answer.data.clone(), answer.survey_id.clone());
        let outcome = self
            .with_conn("upsert_answer", move |c| {
                let tx = c.transaction()?;
                let survey_exists = tx
                    .query_row("SELECT 1 FROM surveys WHERE uid = ?1", params![survey_id], |_| Ok(()))
                    .optional()?
                    .is_some();
                if !survey_exists {
                    return Ok(AnswerWrite::NoSurvey);
                }
                let owner: Option<String> = tx
                    .query_row("SELECT survey_uid FROM answers WHERE uid = ?1", params![id], |r| r.get(0))
                    .optional()?;
                if let Some(owner) = owner.filter(|o| *o != survey_id) {
                    return Ok(AnswerWrite::OwnedBy(owner));
                }
                tx.execute(
                    "INSERT INTO answers (uid, data, survey_uid) VALUES (?1, ?2, ?3) \
                     ON CONFLICT (uid) DO UPDATE SET data = excluded.data, updated_at = CURRENT_TIMESTAMP",
                    params![id, data, survey_id],
                )?;
                tx.commit()?;
                Ok(AnswerWrite::Written)
            })
            .await?;
        match outcome {
            AnswerWrite::Written => {
                debug!(target: "surveyd::storage", "sqlite upsert answer id='{}' survey='{}'", answer.id, answer.survey_id);
                Ok(answer)
            }
            AnswerWrite::NoSurvey => Err(survey_missing(&answer.survey_id)),
            AnswerWrite::OwnedBy(owner) => Err(answer_owned_elsewhere(&answer.id, &owner)),
        }
    }

    async fn list_answers_by_survey(&self, survey_id: &str) -> AppResult<Vec<Answer>> {
        let survey_id = survey_id.to_string();
        self.with_conn("list_answers_by_survey", move |c| {
            let mut stmt = c.prepare("SELECT uid, data, survey_uid FROM answers WHERE survey_uid = ?1 ORDER BY uid")?;
            let rows = stmt.query_map(params![survey_id], answer_from_row)?;
            rows.collect()
        })
        .await
    }
}
