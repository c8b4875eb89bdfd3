#![allow(dead_code)] // Test utilities may not all be used in every test

use axum::{body::Body, http::Request};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

use super::{assertions::TestResponse, setup::TestApp};

// ============================================================================
// Action Helpers
// ============================================================================

impl TestApp {
    /// Send a request through the router and collect the JSON body
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            body: serde_json::from_slice(&bytes).unwrap_or(Value::Null),
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send("POST", uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send("DELETE", uri, token, None).await
    }

    // ============================================================================
    // Convenience Action Methods
    // ============================================================================

    pub async fn register(&self, username: &str, email: &str, password: &str) -> TestResponse {
        self.post(
            "/auth/register",
            None,
            json!({"username": username, "email": email, "password": password}),
        )
        .await
    }

    /// Log in and return the issued token
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post(
                "/auth/login",
                None,
                json!({"username": username, "password": password}),
            )
            .await
            .expect_ok();
        response.body["token"].as_str().unwrap().to_string()
    }

    pub async fn login_admin(&self) -> String {
        self.login("admin", "admin123").await
    }

    /// Register and log in a verified user
    pub async fn signup(&self, username: &str, password: &str) -> String {
        self.register(username, &format!("{}@x.com", username), password)
            .await
            .expect_ok();
        self.login(username, password).await
    }

    /// Stateless move against a client-held FEN
    pub async fn submit_move(&self, fen: &str, mv: &str, request_ai_move: bool) -> TestResponse {
        self.post(
            "/move",
            None,
            json!({"move": mv, "fen": fen, "request_ai_move": request_ai_move}),
        )
        .await
    }

    /// Create a human-vs-human session owned by the token's user
    pub async fn create_human_game(&self, token: &str, white: &str, black: &str) -> String {
        let response = self
            .post(
                "/games",
                Some(token),
                json!({
                    "white": {"type": "human", "name": white},
                    "black": {"type": "human", "name": black}
                }),
            )
            .await
            .expect_ok();
        response.body["id"].as_str().unwrap().to_string()
    }

    pub async fn play(&self, token: &str, game_id: &str, mv: &str) -> TestResponse {
        self.post(
            &format!("/games/{}/move", game_id),
            Some(token),
            json!({"move": mv, "request_ai_move": false}),
        )
        .await
    }
}
