use super::types::{ErrorResponse, HistoryQuery, PromptRequest, PromptResponse};
use crate::{
    generation::{GenerationSnapshot, Session},
    history::{GenerationRecord, HistoryStorage},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
    pub history: Arc<HistoryStorage>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

pub async fn submit_prompt(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> (StatusCode, Json<PromptResponse>) {
    info!("Received prompt ({} chars)", request.prompt.len());

    let generation_id = state.session.submit(request.prompt).await;

    (StatusCode::ACCEPTED, Json(PromptResponse { generation_id }))
}

pub async fn status(
    State(state): State<AppState>,
) -> Result<Json<GenerationSnapshot>, ApiError> {
    match state.session.snapshot().await {
        Some(snapshot) => Ok(Json(snapshot)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No generation has been submitted".to_string(),
            }),
        )),
    }
}

pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<GenerationRecord>>, ApiError> {
    match state.history.recent(query.limit).await {
        Ok(records) => Ok(Json(records)),
        Err(e) => {
            error!("Failed to read generation history: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("History error: {}", e),
                }),
            ))
        }
    }
}
