//! Survey and Answer entities. Both carry an opaque, caller-supplied id and an
//! opaque `data` payload the service never parses.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survey {
    #[serde(rename = "uid")]
    pub id: String,
    pub data: String,
}

impl Survey {
    pub fn new(id: impl Into<String>, data: impl Into<String>) -> Self {
        Self { id: id.into(), data: data.into() }
    }
}

/// A response document. `survey_id` must name a Survey that exists when the Answer is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(rename = "uid")]
    pub id: String,
    pub data: String,
    #[serde(rename = "surveyUid")]
    pub survey_id: String,
}

impl Answer {
    pub fn new(id: impl Into<String>, data: impl Into<String>, survey_id: impl Into<String>) -> Self {
        Self { id: id.into(), data: data.into(), survey_id: survey_id.into() }
    }
}
