use axum::{routing::post, Router};

use crate::shared::AppState;

// Public API - what other modules can use
pub use handlers::{change_password, login, logout, refresh, register, verify, verify_email};
pub use middleware::{admin_auth, bearer_token, jwt_auth};
pub use service::AuthService;
pub use token::{TokenConfig, TokenError};
pub use types::{AuthClaims, ChangePasswordRequest, MessageResponse};

// Internal modules
mod handlers;
mod middleware;
pub mod password;
pub mod service;
mod token;
pub mod types;

/// Routes served by the auth service
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/verify", post(verify))
        .route("/auth/change-password", post(change_password))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/verify-email", post(verify_email))
}
