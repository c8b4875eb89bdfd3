use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use tracing::{debug, instrument};

use super::types::AuthClaims;
use crate::shared::AppError;

/// Why a token was rejected. Only ever logged; callers see a generic
/// `Unauthorized`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("bad signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

impl From<TokenError> for AppError {
    fn from(_: TokenError) -> Self {
        AppError::Unauthorized("Invalid or expired token.".to_string())
    }
}

/// Configuration for JWT token operations
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
    pub expiration_hours: i64,
}

impl TokenConfig {
    pub fn new(secret: String, expiration_hours: i64) -> Self {
        Self {
            secret,
            expiration_hours,
        }
    }

    /// Creates a new JWT token for the given identity, valid from now
    pub fn create_token(
        &self,
        username: &str,
        is_admin: bool,
        email: &str,
    ) -> Result<String, AppError> {
        self.create_token_at(username, is_admin, email, Utc::now())
    }

    /// Creates a token as if issued at `issued_at`
    #[instrument(skip(self, email, issued_at))]
    pub fn create_token_at(
        &self,
        username: &str,
        is_admin: bool,
        email: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let exp = (issued_at + Duration::hours(self.expiration_hours)).timestamp();

        debug!(
            expiration_hours = self.expiration_hours,
            exp_timestamp = exp,
            "Creating JWT token with expiration"
        );

        let claims = AuthClaims {
            username: username.to_string(),
            is_admin,
            email: email.to_string(),
            iat: issued_at.timestamp(),
            exp,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| {
            debug!(error = %e, "Failed to encode JWT token");
            AppError::Internal
        })
    }

    /// Validates a JWT token against the current clock
    pub fn validate_token(&self, token: &str) -> Result<AuthClaims, TokenError> {
        self.validate_token_at(token, Utc::now())
    }

    /// Validates signature and claims, treating `now` as the current time.
    /// No leeway: a token is expired once `now >= exp`.
    #[instrument(skip(self, token, now))]
    pub fn validate_token_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // Expiry is checked below against the supplied clock
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        let claims = decode::<AuthClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            };
            debug!(error = %e, reason = %reason, "Failed to decode JWT token");
            reason
        })?;

        if claims.username.trim().is_empty() {
            debug!("JWT token carries an empty username claim");
            return Err(TokenError::Malformed);
        }

        if now.timestamp() >= claims.exp {
            debug!(
                username = %claims.username,
                exp = claims.exp,
                now = now.timestamp(),
                "JWT token has expired"
            );
            return Err(TokenError::Expired);
        }

        debug!(
            username = %claims.username,
            is_admin = claims.is_admin,
            exp = claims.exp,
            "JWT token decoded successfully"
        );
        Ok(claims)
    }
}
