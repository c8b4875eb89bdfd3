use axum::{
    routing::{get, post},
    Router,
};

use crate::shared::AppState;

// Public API
pub use service::{ExpertService, ASK_MENU};
pub use types::{ExpertRequest, ExpertResponse};

// Internal modules
mod handlers;
mod service;
pub mod types;

/// Chess Q&A served next to the engine. Public like `/move`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/expert/question", post(handlers::question))
        .route("/expert/ask", post(handlers::ask))
        .route("/expert/analyze", post(handlers::analyze))
        .route("/expert/fact", get(handlers::fact))
        .route("/expert/opening", get(handlers::opening))
        .route("/expert/news", get(handlers::news))
}
