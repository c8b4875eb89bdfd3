use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::position::{AppliedMove, GamePosition, GameStatus};
use crate::agent::AgentConfig;

/// Who plays one side of a game session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlayerSlot {
    Human { name: String },
    Agent { config: AgentConfig },
}

impl PlayerSlot {
    pub fn is_agent(&self) -> bool {
        matches!(self, PlayerSlot::Agent { .. })
    }

    pub fn agent_config(&self) -> Option<&AgentConfig> {
        match self {
            PlayerSlot::Agent { config } => Some(config),
            PlayerSlot::Human { .. } => None,
        }
    }

    /// Short key written to the move log header so a game can be resumed
    /// with the same players
    pub fn key(&self) -> String {
        match self {
            PlayerSlot::Human { .. } => "human".to_string(),
            PlayerSlot::Agent { config } => match config {
                AgentConfig::Engine {
                    skill_level: Some(skill),
                    ..
                } => format!("engine:{}", skill),
                AgentConfig::Engine { .. } => "engine".to_string(),
                AgentConfig::Model {
                    model: Some(model),
                    ..
                } => format!("model:{}", model),
                AgentConfig::Model { .. } => "model".to_string(),
                AgentConfig::Random => "random".to_string(),
                AgentConfig::Human => "human".to_string(),
            },
        }
    }

    /// Full slot as one line of JSON, so resumed agents keep every setting
    /// (`movetime_ms`, `strategy`) that the short key leaves out
    pub fn config_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.key())
    }

    /// Reads back a slot from the log header: the JSON config line when
    /// present, the short key otherwise
    pub fn from_log(config: Option<&str>, key: &str, name: &str) -> Option<Self> {
        config
            .and_then(|json| serde_json::from_str(json).ok())
            .or_else(|| Self::from_key(key, name))
    }

    /// Inverse of `key`; `name` is the display name logged next to it
    pub fn from_key(key: &str, name: &str) -> Option<Self> {
        let (kind, arg) = match key.split_once(':') {
            Some((kind, arg)) => (kind, Some(arg)),
            None => (key, None),
        };
        let config = match (kind, arg) {
            ("human", None) => {
                return Some(PlayerSlot::Human {
                    name: name.to_string(),
                })
            }
            ("engine", None) => AgentConfig::Engine {
                skill_level: None,
                movetime_ms: None,
            },
            ("engine", Some(skill)) => AgentConfig::Engine {
                skill_level: Some(skill.parse().ok()?),
                movetime_ms: None,
            },
            ("model", model) => AgentConfig::Model {
                model: model.map(str::to_string),
                strategy: None,
            },
            ("random", None) => AgentConfig::Random,
            _ => return None,
        };
        Some(PlayerSlot::Agent { config })
    }
}

/// A game in progress, held in memory and mirrored to its move log
#[derive(Debug, Clone)]
pub struct GameSession {
    pub id: String,
    pub owner: String,
    pub white: PlayerSlot,
    pub black: PlayerSlot,
    pub white_name: String,
    pub black_name: String,
    pub position: GamePosition,
    pub status: GameStatus,
    pub result: Option<String>,
    pub move_count: u32,
    pub last_move: Option<AppliedMove>,
    pub created_at: DateTime<Utc>,
    /// Last time a move was played or the session was (re)loaded
    pub last_activity: DateTime<Utc>,
}

impl GameSession {
    /// Slot for the side to move
    pub fn slot_to_move(&self) -> &PlayerSlot {
        if self.position.white_to_move() {
            &self.white
        } else {
            &self.black
        }
    }

    pub fn name_to_move(&self) -> &str {
        if self.position.white_to_move() {
            &self.white_name
        } else {
            &self.black_name
        }
    }

    pub fn view(&self) -> GameView {
        GameView {
            id: self.id.clone(),
            owner: self.owner.clone(),
            white: self.white.clone(),
            black: self.black.clone(),
            white_name: self.white_name.clone(),
            black_name: self.black_name.clone(),
            fen: self.position.fen(),
            turn: if self.position.white_to_move() {
                "white".to_string()
            } else {
                "black".to_string()
            },
            status: self.status,
            check: self.position.is_check(),
            result: self.result.clone(),
            move_count: self.move_count,
            last_move: self.last_move.clone(),
            created_at: self.created_at,
        }
    }
}

/// Serializable snapshot of a game session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameView {
    pub id: String,
    pub owner: String,
    pub white: PlayerSlot,
    pub black: PlayerSlot,
    pub white_name: String,
    pub black_name: String,
    pub fen: String,
    pub turn: String,
    pub status: GameStatus,
    pub check: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub move_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_move: Option<AppliedMove>,
    pub created_at: DateTime<Utc>,
}
