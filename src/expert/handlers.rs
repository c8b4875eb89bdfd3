use axum::{extract::State, Json};
use tracing::instrument;

use super::types::{ExpertRequest, ExpertResponse};
use crate::shared::{AppError, AppState};

/// POST /expert/question
#[instrument(name = "expert_question", skip(state, request))]
pub async fn question(
    State(state): State<AppState>,
    Json(request): Json<ExpertRequest>,
) -> Result<Json<ExpertResponse>, AppError> {
    let response = state
        .expert_service
        .question(request.question.as_deref())
        .await?;
    Ok(Json(ExpertResponse { response }))
}

/// POST /expert/ask
#[instrument(name = "expert_ask", skip(state, request))]
pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<ExpertRequest>,
) -> Result<Json<ExpertResponse>, AppError> {
    let response = state.expert_service.ask(request.question.as_deref()).await?;
    Ok(Json(ExpertResponse { response }))
}

/// POST /expert/analyze
#[instrument(name = "expert_analyze", skip(state, request))]
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<ExpertRequest>,
) -> Result<Json<ExpertResponse>, AppError> {
    let response = state.expert_service.analyze(request.fen.as_deref()).await?;
    Ok(Json(ExpertResponse { response }))
}

/// GET /expert/fact
pub async fn fact(State(state): State<AppState>) -> Result<Json<ExpertResponse>, AppError> {
    let response = state.expert_service.fact().await?;
    Ok(Json(ExpertResponse { response }))
}

/// GET /expert/opening
pub async fn opening(State(state): State<AppState>) -> Result<Json<ExpertResponse>, AppError> {
    let response = state.expert_service.opening().await?;
    Ok(Json(ExpertResponse { response }))
}

/// GET /expert/news
pub async fn news(State(state): State<AppState>) -> Result<Json<ExpertResponse>, AppError> {
    let response = state.expert_service.news().await?;
    Ok(Json(ExpertResponse { response }))
}
