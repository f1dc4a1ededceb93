use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::AppResult;
use crate::model::{Answer, Survey};

use super::{answer_owned_elsewhere, survey_missing, EntityStore};

#[derive(Default)]
struct Tables {
    surveys: BTreeMap<String, Survey>,
    answers: BTreeMap<String, Answer>,
}

/// In-process entity store. One lock covers both tables so the survey
/// existence check and the answer write happen atomically.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn get_survey(&self, id: &str) -> AppResult<Option<Survey>> {
        Ok(self.tables.read().surveys.get(id).cloned())
    }

    async fn upsert_survey(&self, survey: Survey) -> AppResult<Survey> {
        let mut t = self.tables.write();
        let replaced = t.surveys.insert(survey.id.clone(), survey.clone()).is_some();
        debug!(target: "surveyd::storage", "memory upsert survey id='{}' replaced={}", survey.id, replaced);
        Ok(survey)
    }

    async fn list_surveys(&self) -> AppResult<Vec<Survey>> {
        Ok(self.tables.read().surveys.values().cloned().collect())
    }

    async fn get_answer(&self, id: &str) -> AppResult<Option<Answer>> {
        Ok(self.tables.read().answers.get(id).cloned())
    }

    async fn upsert_answer(&self, answer: Answer) -> AppResult<Answer> {
        let mut t = self.tables.write();
        if !t.surveys.contains_key(&answer.survey_id) {
            return Err(survey_missing(&answer.survey_id));
        }
        if let Some(existing) = t.answers.get(&answer.id) {
            if existing.survey_id != answer.survey_id {
                return Err(answer_owned_elsewhere(&answer.id, &existing.survey_id));
            }
        }
        let replaced = t.answers.insert(answer.id.clone(), answer.clone()).is_some();
        debug!(
            target: "surveyd::storage",
            "memory upsert answer id='{}' survey='{}' replaced={}", answer.id, answer.survey_id, replaced
        );
        Ok(answer)
    }

    async fn list_answers_by_survey(&self, survey_id: &str) -> AppResult<Vec<Answer>> {
        let t = self.tables.read();
        Ok(t.answers.values().filter(|a| a.survey_id == survey_id).cloned().collect())
    }
}
