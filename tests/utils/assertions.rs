//! Test assertion helpers - fluent API for verifying test expectations
#![allow(dead_code)] // Test utilities may not all be used in every test

use axum::http::StatusCode;
use serde_json::Value;

// ============================================================================
// Assertion Helpers
// ============================================================================

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    /// Assert the status code, returning the response for further checks
    pub fn expect_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.status, expected,
            "unexpected status, body: {}",
            self.body
        );
        self
    }

    pub fn expect_ok(self) -> Self {
        self.expect_status(StatusCode::OK)
    }

    /// Assert an error response in the `{success: false, error}` shape
    pub fn expect_error(self, expected: StatusCode) -> Self {
        let response = self.expect_status(expected);
        assert_eq!(response.body["success"], false);
        assert!(
            response.body["error"].is_string(),
            "error message missing: {}",
            response.body
        );
        response
    }

    pub fn field(&self, key: &str) -> &Value {
        &self.body[key]
    }

    pub fn str_field(&self, key: &str) -> &str {
        self.body[key]
            .as_str()
            .unwrap_or_else(|| panic!("`{}` is not a string in {}", key, self.body))
    }
}
