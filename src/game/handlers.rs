use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Extension, Json,
};
use tracing::{info, instrument};

use super::{
    models::GameView,
    types::{CreateGameRequest, GameMoveRequest, MoveRequest, MoveResponse, ResumeGameRequest},
};
use crate::auth::{bearer_token, AuthClaims};
use crate::shared::{AppError, AppState};
use crate::stats::PlayerStats;

/// Actor name for moves made without a token
const GUEST: &str = "guest";

/// POST /move
///
/// Stateless: the client sends the FEN it holds. A token is optional, but
/// one that is supplied must be valid.
#[instrument(name = "submit_move", skip(state, headers, request), fields(mv = %request.move_text))]
pub async fn submit_move(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<MoveRequest>,
) -> Result<Json<MoveResponse>, AppError> {
    let token = request
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(&headers));

    let actor = match token {
        Some(token) => state.auth_service.authenticate(token).await?.0.username,
        None => GUEST.to_string(),
    };

    let response = state
        .game_service
        .submit_move(
            &actor,
            &request.fen,
            &request.move_text,
            request.request_ai_move,
            request.agent_config,
        )
        .await?;
    Ok(Json(response))
}

/// POST /games
#[instrument(name = "create_game", skip(state, claims, request), fields(username = %claims.username))]
pub async fn create_game(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    Json(request): Json<CreateGameRequest>,
) -> Result<Json<GameView>, AppError> {
    let view = state
        .game_service
        .create_game(&claims.username, request)
        .await?;
    info!(game_id = %view.id, "Game session created");
    Ok(Json(view))
}

/// GET /games/{id}
#[instrument(name = "get_game", skip(state, claims), fields(username = %claims.username))]
pub async fn get_game(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    Path(game_id): Path<String>,
) -> Result<Json<GameView>, AppError> {
    Ok(Json(
        state
            .game_service
            .get_game(&game_id, &claims.username)
            .await?,
    ))
}

/// POST /games/{id}/move
#[instrument(name = "play_move", skip(state, claims, request), fields(username = %claims.username))]
pub async fn play_move(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    Path(game_id): Path<String>,
    Json(request): Json<GameMoveRequest>,
) -> Result<Json<GameView>, AppError> {
    let view = state
        .game_service
        .play_move(
            &game_id,
            &claims.username,
            &request.move_text,
            request.request_ai_move.unwrap_or(true),
        )
        .await?;
    Ok(Json(view))
}

/// POST /games/{id}/agent-move
#[instrument(name = "agent_move", skip(state, claims), fields(username = %claims.username))]
pub async fn agent_move(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    Path(game_id): Path<String>,
) -> Result<Json<GameView>, AppError> {
    Ok(Json(
        state
            .game_service
            .agent_move(&game_id, &claims.username)
            .await?,
    ))
}

/// POST /games/resume
#[instrument(name = "resume_game", skip(state, claims, request), fields(username = %claims.username))]
pub async fn resume_game(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    Json(request): Json<ResumeGameRequest>,
) -> Result<Json<GameView>, AppError> {
    Ok(Json(
        state
            .game_service
            .resume_game(request.game_id.trim(), &claims.username)
            .await?,
    ))
}

/// GET /games/stats
#[instrument(name = "player_stats", skip(state))]
pub async fn player_stats(
    State(state): State<AppState>,
) -> Result<Json<Vec<PlayerStats>>, AppError> {
    Ok(Json(state.game_service.player_stats().await?))
}

/// GET /games/stats/{player}
#[instrument(name = "stats_for_player", skip(state))]
pub async fn stats_for_player(
    State(state): State<AppState>,
    Path(player): Path<String>,
) -> Result<Json<PlayerStats>, AppError> {
    Ok(Json(state.game_service.stats_for(&player).await?))
}
