use axum::{
    extract::{Path, State},
    Extension, Json,
};
use tracing::{info, instrument};

use super::types::{
    AddModelRequest, ModelActionResponse, ModelListResponse, RemoveModelRequest, StatsResponse,
    UpdateModelRequest, UserListResponse,
};
use crate::auth::{ChangePasswordRequest, MessageResponse};
use crate::shared::{AppError, AppState};
use crate::user::UserModel;

/// GET /admin/users
#[instrument(name = "list_users", skip(state, admin), fields(admin = %admin.username))]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(admin): Extension<UserModel>,
) -> Result<Json<UserListResponse>, AppError> {
    let users = state.admin_service.list_users().await?;
    Ok(Json(UserListResponse {
        success: true,
        admin: admin.username,
        total_users: users.len(),
        users,
    }))
}

/// POST /admin/users/{username}/promote
pub async fn promote_user(
    State(state): State<AppState>,
    Extension(admin): Extension<UserModel>,
    Path(username): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let message = state.admin_service.promote(&admin, &username).await?;
    Ok(Json(MessageResponse::ok(message)))
}

/// POST /admin/users/{username}/demote
pub async fn demote_user(
    State(state): State<AppState>,
    Extension(admin): Extension<UserModel>,
    Path(username): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let message = state.admin_service.demote(&admin, &username).await?;
    Ok(Json(MessageResponse::ok(message)))
}

/// POST /admin/users/{username}/verify
pub async fn verify_user(
    State(state): State<AppState>,
    Extension(admin): Extension<UserModel>,
    Path(username): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let message = state.admin_service.verify(&admin, &username).await?;
    Ok(Json(MessageResponse::ok(message)))
}

/// DELETE /admin/users/{username}
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(admin): Extension<UserModel>,
    Path(username): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let message = state.admin_service.delete(&admin, &username).await?;
    Ok(Json(MessageResponse::ok(message)))
}

/// GET /admin/stats
#[instrument(name = "system_stats", skip(state, admin), fields(admin = %admin.username))]
pub async fn system_stats(
    State(state): State<AppState>,
    Extension(admin): Extension<UserModel>,
) -> Result<Json<StatsResponse>, AppError> {
    let stats = state.admin_service.stats().await?;
    Ok(Json(StatsResponse {
        success: true,
        admin: admin.username,
        stats,
    }))
}

/// GET /admin/models
#[instrument(name = "list_models", skip(state, admin), fields(admin = %admin.username))]
pub async fn list_models(
    State(state): State<AppState>,
    Extension(admin): Extension<UserModel>,
) -> Result<Json<ModelListResponse>, AppError> {
    let models = state.admin_service.list_models().await?;
    Ok(Json(ModelListResponse {
        success: true,
        admin: admin.username,
        models,
    }))
}

/// POST /admin/models/add
pub async fn add_model(
    State(state): State<AppState>,
    Extension(admin): Extension<UserModel>,
    Json(request): Json<AddModelRequest>,
) -> Result<Json<ModelActionResponse>, AppError> {
    let message = state.admin_service.add_model(&admin, &request).await?;
    Ok(Json(ModelActionResponse {
        success: true,
        message,
        admin: admin.username,
    }))
}

/// POST /admin/models/remove
pub async fn remove_model(
    State(state): State<AppState>,
    Extension(admin): Extension<UserModel>,
    Json(request): Json<RemoveModelRequest>,
) -> Result<Json<ModelActionResponse>, AppError> {
    let message = state
        .admin_service
        .remove_model(&admin, &request.model_id)
        .await?;
    Ok(Json(ModelActionResponse {
        success: true,
        message,
        admin: admin.username,
    }))
}

/// POST /admin/models/update
pub async fn update_model(
    State(state): State<AppState>,
    Extension(admin): Extension<UserModel>,
    Json(request): Json<UpdateModelRequest>,
) -> Result<Json<ModelActionResponse>, AppError> {
    let message = state
        .admin_service
        .update_model(&admin, &request.model_id, &request.updates)
        .await?;
    Ok(Json(ModelActionResponse {
        success: true,
        message,
        admin: admin.username,
    }))
}

/// POST /admin/change-password
///
/// The caller is already authenticated by `admin_auth`, so a token in the
/// body is ignored.
#[instrument(name = "admin_change_password", skip(state, admin, request), fields(admin = %admin.username))]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(admin): Extension<UserModel>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .auth_service
        .change_password_for(&admin, &request.old_password, &request.new_password)
        .await?;
    info!("Admin password changed");
    Ok(Json(MessageResponse::ok("Password changed successfully.")))
}

#[cfg(test)]
mod tests {
    use crate::registry::ModelRegistry;
    use crate::shared::test_utils::{seed_user, AppStateBuilder};
    use crate::shared::AppState;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use rstest::rstest;
    use serde_json::{json, Value};
    use tower::ServiceExt; // for `oneshot`

    fn app(state: AppState) -> Router {
        crate::admin::router(state.clone()).with_state(state)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    fn request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {}", token))
            .header("content-type", "application/json");
        match body {
            Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn login(state: &AppState, username: &str, password: &str) -> String {
        state
            .auth_service
            .login(username, password)
            .await
            .unwrap()
            .token
    }

    async fn setup() -> (AppState, tempfile::TempDir, String, String) {
        let (state, dir) = AppStateBuilder::new().build();
        seed_user(state.user_repository.as_ref(), "admin", "admin123", true).await;
        seed_user(state.user_repository.as_ref(), "alice", "secret1", false).await;
        let admin_token = login(&state, "admin", "admin123").await;
        let alice_token = login(&state, "alice", "secret1").await;
        (state, dir, admin_token, alice_token)
    }

    #[rstest]
    #[case("GET", "/admin/users")]
    #[case("GET", "/admin/stats")]
    #[case("POST", "/admin/users/admin/demote")]
    #[case("DELETE", "/admin/users/admin")]
    #[case("GET", "/admin/models")]
    #[case("POST", "/admin/models/remove")]
    #[tokio::test]
    async fn test_non_admin_is_forbidden(#[case] method: &str, #[case] uri: &str) {
        let (state, _dir, _, alice_token) = setup().await;
        let app = app(state);

        let (status, body) = send(&app, request(method, uri, &alice_token, None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let (state, _dir, _, _) = setup().await;
        let app = app(state);

        let req = Request::builder()
            .uri("/admin/users")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_list_users_hides_hashes() {
        let (state, _dir, admin_token, _) = setup().await;
        let app = app(state);

        let (status, body) = send(&app, request("GET", "/admin/users", &admin_token, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["admin"], "admin");
        assert_eq!(body["total_users"], 2);
        let users = body["users"].as_array().unwrap();
        assert!(users.iter().all(|u| u.get("password_hash").is_none()));
    }

    #[tokio::test]
    async fn test_promote_then_stats() {
        let (state, _dir, admin_token, _) = setup().await;
        let app = app(state);

        let (status, _) = send(
            &app,
            request("POST", "/admin/users/alice/promote", &admin_token, None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, request("GET", "/admin/stats", &admin_token, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stats"]["admins"], 2);
        assert_eq!(body["stats"]["regular_users"], 0);
    }

    #[tokio::test]
    async fn test_self_delete_is_rejected() {
        let (state, _dir, admin_token, _) = setup().await;
        let app = app(state);

        let (status, _) = send(&app, request("DELETE", "/admin/users/admin", &admin_token, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, request("DELETE", "/admin/users/ghost", &admin_token, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_model_registry_over_http() {
        let (state, _dir, admin_token, _) = setup().await;
        let app = app(state.clone());

        let (status, body) = send(
            &app,
            request(
                "POST",
                "/admin/models/add",
                &admin_token,
                Some(json!({"model_id": "openai/gpt-4o", "name": "GPT-4o", "type": "openrouter"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["admin"], "admin");

        let (status, _) = send(
            &app,
            request(
                "POST",
                "/admin/models/add",
                &admin_token,
                Some(json!({"model_id": "openai/gpt-4o", "name": "Again", "type": "openrouter"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, listed) = send(&app, request("GET", "/admin/models", &admin_token, None)).await;
        assert_eq!(listed["models"][0]["model_id"], "openai/gpt-4o");
        assert_eq!(listed["models"][0]["enabled"], false);

        let (status, _) = send(
            &app,
            request(
                "POST",
                "/admin/models/update",
                &admin_token,
                Some(json!({"model_id": "openai/gpt-4o", "updates": {"enabled": true}})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let entry = state
            .model_registry
            .find_model("openai/gpt-4o")
            .await
            .unwrap()
            .unwrap();
        assert!(entry.enabled);

        let (status, _) = send(
            &app,
            request(
                "POST",
                "/admin/models/remove",
                &admin_token,
                Some(json!({"model_id": "openai/gpt-4o"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            request(
                "POST",
                "/admin/models/update",
                &admin_token,
                Some(json!({"model_id": "openai/gpt-4o", "updates": {"enabled": true}})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_change_password() {
        let (state, _dir, admin_token, _) = setup().await;
        let app = app(state.clone());

        let (status, _) = send(
            &app,
            request(
                "POST",
                "/admin/change-password",
                &admin_token,
                Some(json!({"old_password": "wrong1", "new_password": "newpass1"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &app,
            request(
                "POST",
                "/admin/change-password",
                &admin_token,
                Some(json!({"old_password": "admin123", "new_password": "newpass1"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(state.auth_service.login("admin", "newpass1").await.is_ok());
    }
}
