use async_trait::async_trait;

use super::types::{Agent, AgentError};
use crate::game::GamePosition;

/// Stands in for a person at the board. Never produces a move.
pub struct HumanAgent;

#[async_trait]
impl Agent for HumanAgent {
    async fn propose_move(&self, _position: &GamePosition) -> Result<String, AgentError> {
        Err(AgentError::HumanTurn)
    }

    fn name(&self) -> String {
        "Human".to_string()
    }
}
