//! Object types of the query graph.
//!
//! `SurveyType.answers` is resolved lazily from the store. `AnswerType.survey`
//! is served from the survey the answer was reached through, so walking back to
//! the parent costs no store call.

use async_graphql::{Context, Error, Object, Result};
use tracing::warn;

use crate::error::AppError;
use crate::model::{Answer, Survey};
use crate::storage::SharedStore;

/// Root of every query.
pub struct QueryRoot;

#[Object(name = "Query")]
impl QueryRoot {
    /// All surveys ordered by id, or only the one named by `uid`.
    async fn surveys(&self, ctx: &Context<'_>, uid: Option<String>) -> Result<Vec<SurveyNode>> {
        let store = ctx.data::<SharedStore>()?;
        match uid {
            Some(uid) => match store.get_survey(&uid).await.map_err(store_error)? {
                Some(survey) => Ok(vec![SurveyNode(survey)]),
                None => Err(Error::new("survey not found")),
            },
            None => Ok(store.list_surveys().await.map_err(store_error)?.into_iter().map(SurveyNode).collect()),
        }
    }
}

pub struct SurveyNode(pub Survey);

#[Object(name = "SurveyType")]
impl SurveyNode {
    async fn uid(&self) -> &str {
        &self.0.id
    }

    async fn data(&self) -> &str {
        &self.0.data
    }

    /// Answers referencing this survey. A store failure nulls only this field.
    async fn answers(&self, ctx: &Context<'_>) -> Result<Option<Vec<Option<AnswerNode>>>> {
        let store = ctx.data::<SharedStore>()?;
        let answers = store.list_answers_by_survey(&self.0.id).await.map_err(store_error)?;
        Ok(Some(
            answers
                .into_iter()
                .map(|answer| Some(AnswerNode { answer, survey: self.0.clone() }))
                .collect(),
        ))
    }
}

pub struct AnswerNode {
    answer: Answer,
    survey: Survey,
}

#[Object(name = "AnswerType")]
impl AnswerNode {
    async fn uid(&self) -> &str {
        &self.answer.id
    }

    async fn data(&self) -> &str {
        &self.answer.data
    }

    async fn survey(&self) -> Option<SurveyNode> {
        Some(SurveyNode(self.survey.clone()))
    }
}

fn store_error(e: AppError) -> Error {
    warn!(target: "surveyd::graph", "store failure while resolving: {}", e);
    Error::new(e.message())
}
