use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::admin::AdminService;
use crate::agent::AgentFactory;
use crate::auth::{AuthService, TokenConfig};
use crate::config::AppConfig;
use crate::expert::ExpertService;
use crate::game::{GameService, MoveLog};
use crate::registry::{InMemoryModelRegistry, ModelRegistry};
use crate::stats::{InMemoryStatsRepository, StatsRepository};
use crate::user::UserRepository;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub user_repository: Arc<dyn UserRepository + Send + Sync>,
    pub auth_service: Arc<AuthService>,
    pub admin_service: Arc<AdminService>,
    pub game_service: Arc<GameService>,
    pub expert_service: Arc<ExpertService>,
    pub model_registry: Arc<dyn ModelRegistry>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        user_repository: Arc<dyn UserRepository + Send + Sync>,
    ) -> Self {
        Self::with_stores(
            config,
            user_repository,
            Arc::new(InMemoryStatsRepository::new()),
            Arc::new(InMemoryModelRegistry::new()),
        )
    }

    /// State over explicit stats and model stores, as wired by `main`
    pub fn with_stores(
        config: AppConfig,
        user_repository: Arc<dyn UserRepository + Send + Sync>,
        stats_repository: Arc<dyn StatsRepository>,
        model_registry: Arc<dyn ModelRegistry>,
    ) -> Self {
        let config = Arc::new(config);
        let token_config = TokenConfig::new(
            config.auth.jwt_secret.clone(),
            config.auth.token_expiration_hours,
        );

        let auth_service = Arc::new(AuthService::new(
            Arc::clone(&user_repository),
            token_config,
            config.auth.clone(),
        ));
        let admin_service = Arc::new(AdminService::new(
            Arc::clone(&user_repository),
            Arc::clone(&model_registry),
        ));
        let agents = AgentFactory::new(config.agents.clone(), Arc::clone(&model_registry));
        let expert_service = Arc::new(ExpertService::new(
            agents.chat_client(),
            config.agents.expert_model.clone(),
        ));
        let game_service = Arc::new(GameService::new(
            Arc::clone(&user_repository),
            stats_repository,
            agents,
            MoveLog::new(config.storage.game_log_dir.clone()),
            config.agents.default_agent.clone(),
            config.agents.timeout,
        ));

        Self {
            config,
            user_repository,
            auth_service,
            admin_service,
            game_service,
            expert_service,
            model_registry,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Duplicate identity: {0}")]
    DuplicateIdentity(String),

    #[error("Weak credential: {0}")]
    WeakCredential(String),

    #[error("Invalid username or password")]
    InvalidCredential,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Illegal move: {0}")]
    IllegalMove(String),

    #[error("Game over: {0}")]
    GameOver(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Credential store busy, retry the request")]
    StoreBusy,

    #[error("Upstream model API error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) | AppError::InvalidCredential => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::DuplicateIdentity(_) | AppError::GameOver(_) | AppError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            AppError::WeakCredential(_) | AppError::IllegalMove(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::StoreBusy => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseError(_) | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_error) = &error {
            // SQLITE_BUSY (5) and SQLITE_LOCKED (6)
            if matches!(db_error.code().as_deref(), Some("5") | Some("6")) {
                return AppError::StoreBusy;
            }
        }
        AppError::DatabaseError(error.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match &self {
            AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::DuplicateIdentity(msg)
            | AppError::WeakCredential(msg)
            | AppError::NotFound(msg)
            | AppError::IllegalMove(msg)
            | AppError::GameOver(msg)
            | AppError::Conflict(msg)
            | AppError::BadRequest(msg) => msg.clone(),
            AppError::DatabaseError(msg) => format!("Database error: {}", msg),
            other => other.to_string(),
        };

        let body = Json(json!({
            "success": false,
            "error": error_message
        }));

        (status, body).into_response()
    }
}
