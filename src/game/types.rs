use serde::{Deserialize, Serialize};

use super::models::PlayerSlot;
use super::position::{AppliedMove, GameStatus};
use crate::agent::AgentConfig;

/// Body of the stateless `POST /move`
#[derive(Debug, Clone, Deserialize)]
pub struct MoveRequest {
    pub token: Option<String>,
    #[serde(rename = "move")]
    pub move_text: String,
    pub fen: String,
    #[serde(default)]
    pub request_ai_move: bool,
    pub agent_config: Option<AgentConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoveResponse {
    pub success: bool,
    pub fen: String,
    #[serde(rename = "move")]
    pub applied: AppliedMove,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_move: Option<AppliedMove>,
    pub status: GameStatus,
    pub check: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGameRequest {
    pub white: PlayerSlot,
    pub black: PlayerSlot,
    /// Starting position, standard start if absent
    pub fen: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameMoveRequest {
    #[serde(rename = "move")]
    pub move_text: String,
    /// Let an agent opponent answer in the same request; on by default
    pub request_ai_move: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResumeGameRequest {
    pub game_id: String,
}
