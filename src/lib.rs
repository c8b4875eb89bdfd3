// Library crate for the chess AI services
// This file exposes the public API for integration tests

pub mod admin;
pub mod agent;
pub mod auth;
pub mod config;
pub mod expert;
pub mod game;
pub mod registry;
pub mod server;
pub mod shared;
pub mod stats;
pub mod user;

// Re-export commonly used types for easier access in tests
pub use agent::{Agent, AgentConfig, AgentError, AgentFactory};
pub use config::{AppConfig, ServiceKind};
pub use game::{start_cleanup_task, CleanupConfig, GamePosition, GameService, GameStatus, MoveLog};
pub use registry::{InMemoryModelRegistry, ModelRegistry, SqliteModelRegistry};
pub use shared::{AppError, AppState};
pub use stats::{FileStatsRepository, StatsRepository, STATS_FILE};
pub use user::{InMemoryUserRepository, SqliteUserRepository, UserRepository};
