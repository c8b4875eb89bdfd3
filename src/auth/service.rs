use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    password,
    token::TokenConfig,
    types::{AuthClaims, LoginResponse, RefreshResponse, RegisterRequest, RegisterResponse},
};
use crate::config::AuthConfig;
use crate::shared::AppError;
use crate::user::{NewUser, UserModel, UserRepository};

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@chess.local";

/// Service for registration, login and token checks against the
/// credential store
pub struct AuthService {
    repository: Arc<dyn UserRepository + Send + Sync>,
    token_config: TokenConfig,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(
        repository: Arc<dyn UserRepository + Send + Sync>,
        token_config: TokenConfig,
        config: AuthConfig,
    ) -> Self {
        Self {
            repository,
            token_config,
            config,
        }
    }

    pub fn token_config(&self) -> &TokenConfig {
        &self.token_config
    }

    /// Creates an account. The password is hashed before it reaches the
    /// store.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, AppError> {
        info!("Starting registration");

        validate_username(&request.username)?;
        validate_email(&request.email)?;
        self.validate_password(&request.password)?;

        let password_hash = password::hash(&request.password).map_err(|e| {
            warn!(error = %e, "Password hashing failed");
            AppError::Internal
        })?;
        let verification_token = uuid::Uuid::new_v4().simple().to_string();

        let mut new_user = NewUser::new(&request.username, &request.email, password_hash);
        new_user.is_verified = self.config.dev_mode;
        new_user.verification_token = Some(verification_token.clone());

        let user = self.repository.create_user(&new_user).await?;
        info!(user_id = user.id, dev_mode = self.config.dev_mode, "User registered");

        if self.config.dev_mode {
            return Ok(RegisterResponse {
                success: true,
                message: "Registration successful! (Dev mode: auto-verified)".to_string(),
                verification_token: Some(verification_token),
            });
        }

        Ok(RegisterResponse {
            success: true,
            message: "Registration successful! Please check your email for verification."
                .to_string(),
            verification_token: None,
        })
    }

    /// Checks a username-or-email and password pair and issues a token.
    /// Unknown identity and wrong password fail identically.
    #[instrument(skip(self, password))]
    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginResponse, AppError> {
        let user = match self.repository.find_by_identifier(identifier).await? {
            Some(user) => user,
            None => {
                warn!("Login for unknown identity");
                return Err(AppError::InvalidCredential);
            }
        };

        if !password::verify(password, &user.password_hash) {
            warn!(username = %user.username, "Login with wrong password");
            return Err(AppError::InvalidCredential);
        }

        if self.config.require_verified_login && !user.is_verified {
            warn!(username = %user.username, "Login refused for unverified account");
            return Err(AppError::Forbidden(
                "Account not verified. Please check your email for the verification link."
                    .to_string(),
            ));
        }

        let token = self
            .token_config
            .create_token(&user.username, user.is_admin, &user.email)?;

        info!(username = %user.username, is_admin = user.is_admin, "Login successful");
        Ok(LoginResponse {
            success: true,
            message: format!("Welcome back, {}!", user.username),
            token,
            username: user.username,
            is_admin: user.is_admin,
            email: user.email,
        })
    }

    /// Verifies the token and loads the user it names. A token for a
    /// deleted user is rejected like any other bad token.
    #[instrument(skip(self, token))]
    pub async fn authenticate(&self, token: &str) -> Result<(AuthClaims, UserModel), AppError> {
        let claims = self.token_config.validate_token(token).map_err(|reason| {
            warn!(reason = %reason, "Token rejected");
            AppError::from(reason)
        })?;

        match self.repository.find_by_username(&claims.username).await? {
            Some(user) => Ok((claims, user)),
            None => {
                warn!(username = %claims.username, "Token names a user that no longer exists");
                Err(AppError::Unauthorized("Invalid or expired token.".to_string()))
            }
        }
    }

    /// Admin decisions need both the claim and the stored flag.
    #[instrument(skip(self, token))]
    pub async fn authenticate_admin(&self, token: &str) -> Result<UserModel, AppError> {
        let (claims, user) = self.authenticate(token).await?;
        if !(claims.is_admin && user.is_admin) {
            warn!(
                username = %user.username,
                claim_admin = claims.is_admin,
                stored_admin = user.is_admin,
                "Admin access denied"
            );
            return Err(AppError::Forbidden("Admin access required.".to_string()));
        }
        Ok(user)
    }

    #[instrument(skip(self, token, old_password, new_password))]
    pub async fn change_password(
        &self,
        token: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let (_, user) = self.authenticate(token).await?;
        self.change_password_for(&user, old_password, new_password)
            .await
    }

    /// Replaces the hash once the old password checks out
    #[instrument(skip(self, user, old_password, new_password), fields(username = %user.username))]
    pub async fn change_password_for(
        &self,
        user: &UserModel,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        if !password::verify(old_password, &user.password_hash) {
            warn!("Change password with wrong current password");
            return Err(AppError::InvalidCredential);
        }
        self.validate_password(new_password)?;

        let password_hash = password::hash(new_password).map_err(|e| {
            warn!(error = %e, "Password hashing failed");
            AppError::Internal
        })?;
        self.repository
            .update_password(&user.username, &password_hash)
            .await?;

        info!("Password changed");
        Ok(())
    }

    #[instrument(skip(self, verification_token))]
    pub async fn verify_email(&self, verification_token: &str) -> Result<String, AppError> {
        let user = self
            .repository
            .find_by_verification_token(verification_token)
            .await?
            .filter(|u| !u.is_verified)
            .ok_or_else(|| {
                warn!("Unknown or already used verification token");
                AppError::NotFound("Invalid verification token.".to_string())
            })?;

        self.repository.mark_verified(&user.username).await?;
        info!(username = %user.username, "Email verified");
        Ok(user.username)
    }

    /// Re-issues a token carrying the user's current role
    #[instrument(skip(self, token))]
    pub async fn refresh(&self, token: &str) -> Result<RefreshResponse, AppError> {
        let (_, user) = self.authenticate(token).await?;
        let token = self
            .token_config
            .create_token(&user.username, user.is_admin, &user.email)?;

        info!(username = %user.username, "Token refreshed");
        Ok(RefreshResponse {
            success: true,
            token,
            username: user.username,
            is_admin: user.is_admin,
        })
    }

    /// Creates the `admin` account on first start. Returns whether a row was
    /// inserted.
    #[instrument(skip(self))]
    pub async fn seed_default_admin(&self) -> Result<bool, AppError> {
        if self
            .repository
            .find_by_username(DEFAULT_ADMIN_USERNAME)
            .await?
            .is_some()
        {
            return Ok(false);
        }

        let password_hash = password::hash(&self.config.default_admin_password).map_err(|e| {
            warn!(error = %e, "Password hashing failed");
            AppError::Internal
        })?;
        let mut admin = NewUser::new(DEFAULT_ADMIN_USERNAME, DEFAULT_ADMIN_EMAIL, password_hash);
        admin.is_admin = true;
        admin.is_verified = true;

        match self.repository.create_user(&admin).await {
            Ok(_) => {
                info!("Default admin account created");
                Ok(true)
            }
            // Another process seeded it first
            Err(AppError::DuplicateIdentity(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn validate_password(&self, password: &str) -> Result<(), AppError> {
        let length = password.chars().count();
        let (min, max) = (
            self.config.password_min_length,
            self.config.password_max_length,
        );
        if length < min || length > max {
            return Err(AppError::WeakCredential(format!(
                "Password must be between {} and {} characters.",
                min, max
            )));
        }
        Ok(())
    }
}

fn validate_username(username: &str) -> Result<(), AppError> {
    let username = username.trim();
    let length = username.chars().count();
    let allowed = username.chars().all(|c| {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
    });
    if !(3..=32).contains(&length) || !allowed {
        return Err(AppError::BadRequest(
            "Username must be 3-32 characters of letters, digits, '_', '.' or '-'.".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AppError::BadRequest("Invalid email address.".to_string())),
    }
}
