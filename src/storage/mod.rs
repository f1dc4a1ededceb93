//!
//! surveyd storage module
//! ----------------------
//! The entity store is the only owner of persisted Survey and Answer rows. The
//! REST handlers and the query graph both talk to it through the `EntityStore`
//! trait and hold no copies between requests.
//!
//! Key responsibilities:
//! - Point lookups and full scans of surveys.
//! - Upsert (insert-or-replace keyed by id) for both entity kinds.
//! - Enforcing the Answer -> Survey reference at write time.
//! - Listing the answers that reference one survey (the relation resolver's input).
//!
//! Backends are swappable. `open_store` picks one from the configured URL scheme;
//! nothing else in the crate branches on which backend is running.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::model::{Answer, Survey};

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// Persistence contract consumed by the resource API and the query graph.
///
/// Every call is atomic on its own; a read issued after a completed write to
/// the same id observes that write.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn get_survey(&self, id: &str) -> AppResult<Option<Survey>>;

    /// Insert or replace by `survey.id`.
    async fn upsert_survey(&self, survey: Survey) -> AppResult<Survey>;

    /// Every survey, ordered by id.
    async fn list_surveys(&self) -> AppResult<Vec<Survey>>;

    async fn get_answer(&self, id: &str) -> AppResult<Option<Answer>>;

    /// Insert or replace by `answer.id`.
    ///
    /// Fails with `NotFound` when `answer.survey_id` names no survey and with
    /// `Conflict` when the id is already taken by an answer of another survey.
    async fn upsert_answer(&self, answer: Answer) -> AppResult<Answer>;

    /// Answers whose `survey_id` equals `survey_id`, ordered by id.
    async fn list_answers_by_survey(&self, survey_id: &str) -> AppResult<Vec<Answer>>;
}

/// Cheap-clone handle shared by every request task.
#[derive(Clone)]
pub struct SharedStore(pub Arc<dyn EntityStore>);

impl SharedStore {
    pub fn new<S: EntityStore + 'static>(store: S) -> Self {
        SharedStore(Arc::new(store))
    }

    pub fn memory() -> Self {
        SharedStore::new(MemoryStore::new())
    }
}

impl std::ops::Deref for SharedStore {
    type Target = dyn EntityStore;
    fn deref(&self) -> &Self::Target { self.0.as_ref() }
}

/// Open the backend named by the URL scheme: `memory://`, `sqlite3://` or `postgres://`.
pub async fn open_store(url: &str) -> AppResult<SharedStore> {
    let scheme = url.split_once("://").map(|(s, _)| s.to_ascii_lowercase()).unwrap_or_default();
    match scheme.as_str() {
        "memory" => {
            info!(target: "surveyd::storage", "using in-memory entity store");
            Ok(SharedStore::memory())
        }
        #[cfg(feature = "postgres")]
        "postgres" | "postgresql" => {
            info!(target: "surveyd::storage", "connecting to postgres entity store");
            let store = PgStore::connect(url).await?;
            Ok(SharedStore::new(store))
        }
        #[cfg(feature = "sqlite")]
        "sqlite3" | "sqlite" => {
            info!(target: "surveyd::storage", "opening sqlite entity store");
            Ok(SharedStore::new(SqliteStore::open(url)?))
        }
        "" => Err(AppError::config("invalid_database_url", format!("database URL has no scheme: {url}"))),
        other => Err(AppError::config("unsupported_database", format!("no entity store backend for scheme '{other}'"))),
    }
}

pub(crate) fn survey_missing(survey_id: &str) -> AppError {
    AppError::not_found("survey_not_found", format!("survey '{survey_id}' does not exist"))
}

pub(crate) fn answer_owned_elsewhere(answer_id: &str, owner: &str) -> AppError {
    AppError::conflict(
        "answer_conflict",
        format!("answer '{answer_id}' belongs to another survey ('{owner}')"),
    )
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod storage_tests;
