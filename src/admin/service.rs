use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::types::{AddModelRequest, SystemStats};
use crate::registry::{ModelEntry, ModelRegistry, ModelUpdate};
use crate::shared::AppError;
use crate::user::{UserModel, UserProfile, UserRepository};

/// Privileged user and model management. Callers pass the
/// already-authenticated admin; every operation here trusts that check.
pub struct AdminService {
    repository: Arc<dyn UserRepository + Send + Sync>,
    models: Arc<dyn ModelRegistry>,
}

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("Missing {}.", field)));
    }
    if value.chars().any(char::is_control) {
        return Err(AppError::BadRequest(format!(
            "{} must not contain control characters.",
            field
        )));
    }
    Ok(())
}

impl AdminService {
    pub fn new(
        repository: Arc<dyn UserRepository + Send + Sync>,
        models: Arc<dyn ModelRegistry>,
    ) -> Self {
        Self { repository, models }
    }

    pub async fn list_users(&self) -> Result<Vec<UserProfile>, AppError> {
        let users = self.repository.list_users().await?;
        Ok(users.iter().map(UserModel::profile).collect())
    }

    async fn require_user(&self, username: &str) -> Result<UserModel, AppError> {
        self.repository
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User '{}' not found.", username)))
    }

    fn refuse_self(admin: &UserModel, username: &str, action: &str) -> Result<(), AppError> {
        if admin.username.eq_ignore_ascii_case(username) {
            warn!(admin = %admin.username, action, "Admin tried to act on own account");
            return Err(AppError::BadRequest(format!(
                "You cannot {} your own account.",
                action
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, admin), fields(admin = %admin.username))]
    pub async fn promote(&self, admin: &UserModel, username: &str) -> Result<String, AppError> {
        let user = self.require_user(username).await?;
        if user.is_admin {
            return Ok(format!("User '{}' is already an admin.", user.username));
        }
        self.repository.set_admin(&user.username, true).await?;
        info!(username = %user.username, "User promoted to admin");
        Ok(format!("User '{}' promoted to admin.", user.username))
    }

    #[instrument(skip(self, admin), fields(admin = %admin.username))]
    pub async fn demote(&self, admin: &UserModel, username: &str) -> Result<String, AppError> {
        Self::refuse_self(admin, username, "demote")?;
        let user = self.require_user(username).await?;
        if !user.is_admin {
            return Ok(format!("User '{}' is not an admin.", user.username));
        }
        self.repository.set_admin(&user.username, false).await?;
        info!(username = %user.username, "User demoted from admin");
        Ok(format!("User '{}' demoted from admin.", user.username))
    }

    #[instrument(skip(self, admin), fields(admin = %admin.username))]
    pub async fn verify(&self, admin: &UserModel, username: &str) -> Result<String, AppError> {
        let user = self.require_user(username).await?;
        self.repository.mark_verified(&user.username).await?;
        info!(username = %user.username, "User verified by admin");
        Ok(format!("User '{}' verified.", user.username))
    }

    #[instrument(skip(self, admin), fields(admin = %admin.username))]
    pub async fn delete(&self, admin: &UserModel, username: &str) -> Result<String, AppError> {
        Self::refuse_self(admin, username, "delete")?;
        self.repository.delete_user(username).await?;
        info!(username = %username, "User deleted");
        Ok(format!("User '{}' deleted.", username.to_lowercase()))
    }

    pub async fn stats(&self) -> Result<SystemStats, AppError> {
        Ok(self.repository.counts().await?.into())
    }

    pub async fn list_models(&self) -> Result<Vec<ModelEntry>, AppError> {
        self.models.list_models().await
    }

    /// Registers a model, disabled until an admin enables it
    #[instrument(skip(self, admin, request), fields(admin = %admin.username, model_id = %request.model_id))]
    pub async fn add_model(
        &self,
        admin: &UserModel,
        request: &AddModelRequest,
    ) -> Result<String, AppError> {
        require_text("model_id", &request.model_id)?;
        require_text("name", &request.name)?;
        require_text("type", &request.kind)?;
        let entry = ModelEntry::new(
            &request.model_id,
            &request.name,
            &request.kind,
            request.provider.clone(),
            request.skill_level,
        );
        self.models.add_model(&entry).await?;
        info!("Model registered");
        Ok(format!(
            "Model '{}' added. Enable it to make it available.",
            entry.model_id
        ))
    }

    #[instrument(skip(self, admin), fields(admin = %admin.username))]
    pub async fn remove_model(&self, admin: &UserModel, model_id: &str) -> Result<String, AppError> {
        self.models.remove_model(model_id.trim()).await?;
        info!("Model removed");
        Ok(format!("Model '{}' removed.", model_id.trim()))
    }

    #[instrument(skip(self, admin, updates), fields(admin = %admin.username))]
    pub async fn update_model(
        &self,
        admin: &UserModel,
        model_id: &str,
        updates: &ModelUpdate,
    ) -> Result<String, AppError> {
        if let Some(name) = &updates.name {
            require_text("name", name)?;
        }
        if let Some(kind) = &updates.kind {
            require_text("type", kind)?;
        }
        let entry = self.models.update_model(model_id.trim(), updates).await?;
        info!(enabled = entry.enabled, "Model updated");
        Ok(format!("Model '{}' updated.", entry.model_id))
    }

    /// Registers the server's default model as enabled on an empty slot, so
    /// a fresh install can play against it. Returns whether it was added.
    pub async fn seed_default_model(&self, model_id: &str) -> Result<bool, AppError> {
        if self.models.find_model(model_id).await?.is_some() {
            return Ok(false);
        }
        let mut entry = ModelEntry::new(model_id, model_id, "openrouter", None, None);
        entry.enabled = true;
        match self.models.add_model(&entry).await {
            Ok(()) => {
                info!(model_id = %model_id, "Seeded default model");
                Ok(true)
            }
            // Another process seeded it first
            Err(AppError::Conflict(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
