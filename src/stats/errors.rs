use thiserror::Error;

use crate::shared::AppError;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Stats storage error: {0}")]
    Storage(String),
}

impl From<StatsError> for AppError {
    fn from(error: StatsError) -> Self {
        match error {
            StatsError::Validation(msg) => AppError::BadRequest(msg),
            StatsError::Storage(msg) => {
                tracing::warn!(error = %msg, "Stats storage failed");
                AppError::Internal
            }
        }
    }
}
