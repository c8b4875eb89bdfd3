pub mod engine;
pub mod factory;
pub mod human;
pub mod model;
pub mod random;
pub mod types;

pub use engine::EngineAgent;
pub use factory::AgentFactory;
pub use human::HumanAgent;
pub use model::{ChatClient, ModelAgent};
pub use random::{random_legal_move, RandomAgent};
pub use types::{Agent, AgentConfig, AgentError};
