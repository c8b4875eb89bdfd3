// Public API - what other modules can use
pub use models::{NewUser, UserCounts, UserModel, UserProfile};
pub use repository::{InMemoryUserRepository, SqliteUserRepository, UserRepository};

// Internal modules
mod models;
pub mod repository;
