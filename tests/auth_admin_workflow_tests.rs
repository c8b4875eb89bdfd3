use axum::http::StatusCode;
use chrono::{Duration, Utc};
use rstest::rstest;
use serde_json::json;

use chess_ai::{ServiceKind, UserRepository};

mod utils;

use utils::*;

#[tokio::test]
async fn test_register_login_and_verify_round_trip() {
    let setup = TestAppBuilder::new().build().await;

    setup
        .register("alice", "alice@x.com", "secret1")
        .await
        .expect_ok();
    let token = setup.login("alice", "secret1").await;

    let verified = setup
        .post("/auth/verify", None, json!({"token": token}))
        .await
        .expect_ok();
    assert_eq!(verified.field("valid"), true);
    assert_eq!(verified.str_field("username"), "alice");
    assert_eq!(verified.field("is_admin"), false);
    assert_eq!(verified.str_field("email"), "alice@x.com");
}

#[tokio::test]
async fn test_login_by_email() {
    let setup = TestAppBuilder::new().build().await;
    setup.signup("alice", "secret1").await;

    let response = setup
        .post(
            "/auth/login",
            None,
            json!({"email": "alice@x.com", "password": "secret1"}),
        )
        .await
        .expect_ok();
    assert_eq!(response.str_field("username"), "alice");
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_fail_alike() {
    let setup = TestAppBuilder::new().build().await;
    setup.signup("alice", "secret1").await;

    let wrong = setup
        .post(
            "/auth/login",
            None,
            json!({"username": "alice", "password": "nope123"}),
        )
        .await
        .expect_error(StatusCode::UNAUTHORIZED);
    let unknown = setup
        .post(
            "/auth/login",
            None,
            json!({"username": "mallory", "password": "nope123"}),
        )
        .await
        .expect_error(StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body, unknown.body);
}

#[rstest]
#[case::in_memory(false)]
#[case::sqlite(true)]
#[tokio::test]
async fn test_duplicate_identity_is_rejected(#[case] sqlite: bool) {
    let mut builder = TestAppBuilder::new();
    if sqlite {
        builder = builder.with_sqlite();
    }
    let setup = builder.build().await;

    setup
        .register("alice", "alice@x.com", "secret1")
        .await
        .expect_ok();

    // Same username, different email
    setup
        .register("alice", "other@x.com", "secret1")
        .await
        .expect_error(StatusCode::CONFLICT);
    // Same email, different username
    setup
        .register("alicia", "alice@x.com", "secret1")
        .await
        .expect_error(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_weak_password_is_rejected() {
    let setup = TestAppBuilder::new().build().await;
    setup
        .register("alice", "alice@x.com", "abc")
        .await
        .expect_error(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_expired_token_fails_verification() {
    let setup = TestAppBuilder::new().build().await;
    setup.signup("alice", "secret1").await;

    let token_config = setup.state.auth_service.token_config();
    let stale = token_config
        .create_token_at("alice", false, "alice@x.com", Utc::now() - Duration::hours(25))
        .unwrap();

    let response = setup
        .post("/auth/verify", None, json!({"token": stale}))
        .await
        .expect_ok();
    assert_eq!(response.field("valid"), false);

    setup
        .post(
            "/auth/change-password",
            Some(&stale),
            json!({"old_password": "secret1", "new_password": "secret2"}),
        )
        .await
        .expect_error(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password_then_login() {
    let setup = TestAppBuilder::new().build().await;
    let token = setup.signup("alice", "secret1").await;

    setup
        .post(
            "/auth/change-password",
            None,
            json!({"token": token, "old_password": "secret1", "new_password": "secret2"}),
        )
        .await
        .expect_ok();

    setup
        .post(
            "/auth/login",
            None,
            json!({"username": "alice", "password": "secret1"}),
        )
        .await
        .expect_error(StatusCode::UNAUTHORIZED);
    setup.login("alice", "secret2").await;
}

#[tokio::test]
async fn test_email_verification_gates_login_when_required() {
    let setup = TestAppBuilder::new()
        .with_config(|c| {
            c.auth.dev_mode = false;
            c.auth.require_verified_login = true;
        })
        .build()
        .await;

    let registered = setup
        .register("alice", "alice@x.com", "secret1")
        .await
        .expect_ok();
    assert!(registered.field("verification_token").is_null());

    setup
        .post(
            "/auth/login",
            None,
            json!({"username": "alice", "password": "secret1"}),
        )
        .await
        .expect_error(StatusCode::FORBIDDEN);

    let stored = setup
        .state
        .user_repository
        .find_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    let verification_token = stored.verification_token.unwrap();

    setup
        .post(
            "/auth/verify-email",
            None,
            json!({"token": verification_token}),
        )
        .await
        .expect_ok();
    setup.login("alice", "secret1").await;

    // A verification token works once
    setup
        .post(
            "/auth/verify-email",
            None,
            json!({"token": verification_token}),
        )
        .await
        .expect_error(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_promotion_takes_effect_after_relogin() {
    let setup = TestAppBuilder::new().build().await;
    let alice_token = setup.signup("alice", "secret1").await;

    setup
        .get("/admin/stats", Some(&alice_token))
        .await
        .expect_error(StatusCode::FORBIDDEN);

    let admin_token = setup.login_admin().await;
    setup
        .post("/admin/users/alice/promote", Some(&admin_token), json!({}))
        .await
        .expect_ok();

    // The old token still carries is_admin = false
    setup
        .get("/admin/stats", Some(&alice_token))
        .await
        .expect_error(StatusCode::FORBIDDEN);

    let fresh = setup.login("alice", "secret1").await;
    let stats = setup.get("/admin/stats", Some(&fresh)).await.expect_ok();
    assert_eq!(stats.str_field("admin"), "alice");
    assert_eq!(stats.body["stats"]["admins"], 2);
}

#[tokio::test]
async fn test_demoted_admin_loses_access_with_old_token() {
    let setup = TestAppBuilder::new().build().await;
    setup.signup("alice", "secret1").await;
    let admin_token = setup.login_admin().await;

    setup
        .post("/admin/users/alice/promote", Some(&admin_token), json!({}))
        .await
        .expect_ok();
    let alice_admin_token = setup.login("alice", "secret1").await;
    setup
        .get("/admin/users", Some(&alice_admin_token))
        .await
        .expect_ok();

    setup
        .post("/admin/users/alice/demote", Some(&admin_token), json!({}))
        .await
        .expect_ok();
    setup
        .get("/admin/users", Some(&alice_admin_token))
        .await
        .expect_error(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deleted_user_token_is_rejected() {
    let setup = TestAppBuilder::new().build().await;
    let alice_token = setup.signup("alice", "secret1").await;
    let admin_token = setup.login_admin().await;

    setup
        .delete("/admin/users/alice", Some(&admin_token))
        .await
        .expect_ok();

    let response = setup
        .post("/auth/verify", None, json!({"token": alice_token}))
        .await
        .expect_ok();
    assert_eq!(response.field("valid"), false);
    setup
        .delete("/admin/users/alice", Some(&admin_token))
        .await
        .expect_error(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_users_survive_restart_with_sqlite() {
    let first = TestAppBuilder::new().with_sqlite().build().await;
    first.signup("alice", "secret1").await;

    let second = TestAppBuilder::new()
        .with_sqlite()
        .sharing_data_with(&first.data_dir)
        .build()
        .await;
    let token = second.login("alice", "secret1").await;
    assert!(!token.is_empty());

    // Seeding is idempotent across restarts
    let admin_token = second.login_admin().await;
    let users = second
        .get("/admin/users", Some(&admin_token))
        .await
        .expect_ok();
    assert_eq!(users.field("total_users"), 2);
}

#[tokio::test]
async fn test_auth_service_does_not_serve_admin_routes() {
    let setup = TestAppBuilder::new()
        .with_service(ServiceKind::Auth)
        .build()
        .await;
    let admin_token = setup.login_admin().await;

    setup
        .get("/admin/users", Some(&admin_token))
        .await
        .expect_status(StatusCode::NOT_FOUND);
    let health = setup.get("/health", None).await.expect_ok();
    assert_eq!(health.str_field("service"), "chess-ai-auth-service");
}
