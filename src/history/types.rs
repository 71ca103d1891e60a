use crate::generation::{GenerationSnapshot, GenerationState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One finished generation, as kept in the history table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: Option<i64>,
    pub generation_id: String,
    pub prompt: String,
    pub prediction_id: Option<String>,
    pub status: String,
    pub output_url: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl GenerationRecord {
    pub fn new(generation_id: String, prompt: String, status: String) -> Self {
        Self {
            id: None,
            generation_id,
            prompt,
            prediction_id: None,
            status,
            output_url: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn from_snapshot(snapshot: &GenerationSnapshot) -> Self {
        let context = &snapshot.context;
        Self {
            id: None,
            generation_id: context.id.to_string(),
            prompt: context.prompt.clone(),
            prediction_id: context.prediction_id.clone(),
            status: snapshot.state.as_str().to_string(),
            output_url: context.output_url.clone(),
            error: context.last_error.clone(),
            created_at: context.started_at,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == GenerationState::Done.as_str()
    }
}
