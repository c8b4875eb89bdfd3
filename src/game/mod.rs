use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::jwt_auth;
use crate::shared::AppState;

// Public API
pub use cleanup_task::{start_cleanup_task, CleanupConfig};
pub use handlers::{
    agent_move, create_game, get_game, play_move, player_stats, resume_game, stats_for_player,
    submit_move,
};
pub use models::{GameSession, GameView, PlayerSlot};
pub use move_log::{GameHeader, LoggedGame, MoveLog, PRACTICE_LOG};
pub use position::{AppliedMove, GamePosition, GameStatus, PositionError};
pub use service::{AgentReply, GameService};
pub use types::{CreateGameRequest, GameMoveRequest, MoveRequest, MoveResponse, ResumeGameRequest};

// Internal modules
mod cleanup_task;
mod handlers;
pub mod models;
pub mod move_log;
pub mod position;
mod repository;
mod service;
pub mod types;

/// Routes served by the engine service. `/move` checks its optional token
/// itself; the session routes sit behind `jwt_auth`.
pub fn router(state: AppState) -> Router<AppState> {
    let sessions = Router::new()
        .route("/games", post(create_game))
        .route("/games/stats", get(player_stats))
        .route("/games/stats/:player", get(stats_for_player))
        .route("/games/resume", post(resume_game))
        .route("/games/:id", get(get_game))
        .route("/games/:id/move", post(play_move))
        .route("/games/:id/agent-move", post(agent_move))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth));

    Router::new()
        .route("/move", post(submit_move))
        .merge(sessions)
}
