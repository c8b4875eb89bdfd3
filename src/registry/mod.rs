// Public API
pub use models::{ModelEntry, ModelUpdate};
pub use repository::{InMemoryModelRegistry, ModelRegistry, SqliteModelRegistry};

// Internal modules
mod models;
pub mod repository;
