use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::GamePosition;

/// Configuration for the player on one side of the board. Tagged by
/// `kind` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AgentConfig {
    Engine {
        #[serde(default)]
        skill_level: Option<u8>,
        #[serde(default)]
        movetime_ms: Option<u64>,
    },
    Model {
        /// Falls back to the server's default model
        #[serde(default)]
        model: Option<String>,
        /// Extra instruction appended to the prompt, e.g. "play aggressively"
        #[serde(default)]
        strategy: Option<String>,
    },
    Random,
    Human,
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent timed out")]
    Timeout,

    #[error("agent unavailable: {0}")]
    Unavailable(String),

    #[error("agent returned an unusable move: {0}")]
    BadReply(String),

    #[error("no legal moves in this position")]
    NoLegalMoves,

    #[error("a human must submit this move")]
    HumanTurn,

    #[error("engine process error: {0}")]
    Process(#[from] std::io::Error),

    #[error("model API error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Anything that can choose a move for the side to play
#[async_trait]
pub trait Agent: Send + Sync {
    /// Returns a UCI move. Callers still check legality before applying it.
    async fn propose_move(&self, position: &GamePosition) -> Result<String, AgentError>;

    /// Name used in move logs and player stats
    fn name(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_agent_config_wire_format() {
        let config: AgentConfig = serde_json::from_value(json!({"kind": "engine"})).unwrap();
        assert_eq!(
            config,
            AgentConfig::Engine {
                skill_level: None,
                movetime_ms: None
            }
        );

        let config: AgentConfig =
            serde_json::from_value(json!({"kind": "model", "model": "openai/gpt-4o"})).unwrap();
        assert_eq!(
            config,
            AgentConfig::Model {
                model: Some("openai/gpt-4o".to_string()),
                strategy: None
            }
        );

        let value = serde_json::to_value(AgentConfig::Random).unwrap();
        assert_eq!(value, json!({"kind": "random"}));

        assert!(serde_json::from_value::<AgentConfig>(json!({"kind": "oracle"})).is_err());
    }
}
