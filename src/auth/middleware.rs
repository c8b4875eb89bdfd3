use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use crate::shared::{AppError, AppState};

/// Token from an `Authorization: Bearer <token>` header, if present
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn require_bearer(req: &Request) -> Result<String, AppError> {
    bearer_token(req.headers()).map(str::to_string).ok_or_else(|| {
        warn!("Missing or malformed Authorization header");
        AppError::Unauthorized("Authorization required.".to_string())
    })
}

/// JWT authentication middleware - validates the Bearer header against a
/// live user and adds AuthClaims to the request.
/// Usage: .layer(middleware::from_fn_with_state(app_state.clone(), auth::jwt_auth))
/// Handlers can then extract Extension(claims): Extension<AuthClaims>.
#[instrument(skip(state, req, next), fields(uri = %req.uri()))]
pub async fn jwt_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = require_bearer(&req)?;
    let (claims, _) = state.auth_service.authenticate(&token).await?;

    debug!(username = %claims.username, "Authentication successful, adding claims to request");
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Admin gate. Re-verifies the token on every request and requires both the
/// admin claim and the stored admin flag; inserts the caller's UserModel.
#[instrument(skip(state, req, next), fields(uri = %req.uri()))]
pub async fn admin_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = require_bearer(&req)?;
    let admin = state.auth_service.authenticate_admin(&token).await?;

    debug!(admin = %admin.username, "Admin authenticated");
    req.extensions_mut().insert(admin);

    Ok(next.run(req).await)
}
