use async_trait::async_trait;
use rand::seq::IndexedRandom;

use super::types::{Agent, AgentError};
use crate::game::GamePosition;

/// Uniformly random legal move
pub fn random_legal_move(position: &GamePosition) -> Option<String> {
    position.legal_moves_uci().choose(&mut rand::rng()).cloned()
}

/// Plays uniformly random legal moves. Also the fallback for every other
/// agent.
pub struct RandomAgent;

impl RandomAgent {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RandomAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for RandomAgent {
    async fn propose_move(&self, position: &GamePosition) -> Result<String, AgentError> {
        random_legal_move(position).ok_or(AgentError::NoLegalMoves)
    }

    fn name(&self) -> String {
        "Random".to_string()
    }
}
