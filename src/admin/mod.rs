use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::auth::admin_auth;
use crate::shared::AppState;

// Public API
pub use handlers::{
    add_model, change_password, delete_user, demote_user, list_models, list_users, promote_user,
    remove_model, system_stats, update_model, verify_user,
};
pub use service::AdminService;
pub use types::{
    AddModelRequest, ModelActionResponse, ModelListResponse, RemoveModelRequest, StatsResponse,
    SystemStats, UpdateModelRequest, UserListResponse,
};

// Internal modules
mod handlers;
mod service;
pub mod types;

/// Routes served by the admin service, all behind `admin_auth`
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/:username", delete(delete_user))
        .route("/admin/users/:username/promote", post(promote_user))
        .route("/admin/users/:username/demote", post(demote_user))
        .route("/admin/users/:username/verify", post(verify_user))
        .route("/admin/stats", get(system_stats))
        .route("/admin/change-password", post(change_password))
        .route("/admin/models", get(list_models))
        .route("/admin/models/add", post(add_model))
        .route("/admin/models/remove", post(remove_model))
        .route("/admin/models/update", post(update_model))
        .route_layer(middleware::from_fn_with_state(state, admin_auth))
}
