use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use super::models::{ModelEntry, ModelUpdate};
use crate::shared::AppError;

/// Admin-managed list of AI models players may choose
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    /// Fails with `Conflict` if the ID is already registered
    async fn add_model(&self, entry: &ModelEntry) -> Result<(), AppError>;
    async fn find_model(&self, model_id: &str) -> Result<Option<ModelEntry>, AppError>;
    /// All entries, ordered by ID
    async fn list_models(&self) -> Result<Vec<ModelEntry>, AppError>;
    async fn update_model(
        &self,
        model_id: &str,
        update: &ModelUpdate,
    ) -> Result<ModelEntry, AppError>;
    async fn remove_model(&self, model_id: &str) -> Result<(), AppError>;
}

fn already_registered(model_id: &str) -> AppError {
    AppError::Conflict(format!("Model '{}' already exists.", model_id))
}

fn model_not_found(model_id: &str) -> AppError {
    AppError::NotFound(format!("Model '{}' not found.", model_id))
}

#[derive(Default)]
pub struct InMemoryModelRegistry {
    models: RwLock<BTreeMap<String, ModelEntry>>,
}

impl InMemoryModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModelRegistry for InMemoryModelRegistry {
    async fn add_model(&self, entry: &ModelEntry) -> Result<(), AppError> {
        let mut models = self.models.write().await;
        if models.contains_key(&entry.model_id) {
            return Err(already_registered(&entry.model_id));
        }
        models.insert(entry.model_id.clone(), entry.clone());
        Ok(())
    }

    async fn find_model(&self, model_id: &str) -> Result<Option<ModelEntry>, AppError> {
        Ok(self.models.read().await.get(model_id).cloned())
    }

    async fn list_models(&self) -> Result<Vec<ModelEntry>, AppError> {
        Ok(self.models.read().await.values().cloned().collect())
    }

    async fn update_model(
        &self,
        model_id: &str,
        update: &ModelUpdate,
    ) -> Result<ModelEntry, AppError> {
        let mut models = self.models.write().await;
        let entry = models
            .get_mut(model_id)
            .ok_or_else(|| model_not_found(model_id))?;
        entry.apply(update);
        Ok(entry.clone())
    }

    async fn remove_model(&self, model_id: &str) -> Result<(), AppError> {
        self.models
            .write()
            .await
            .remove(model_id)
            .map(|_| ())
            .ok_or_else(|| model_not_found(model_id))
    }
}

const MODEL_COLUMNS: &str = "model_id, name, kind, provider, skill_level, enabled, created_at";

/// Registry kept in the `models` table next to `users`
pub struct SqliteModelRegistry {
    pool: SqlitePool,
}

impl SqliteModelRegistry {
    /// Shares an existing pool (normally the credential store's) and makes
    /// sure the table exists
    pub async fn new(pool: SqlitePool) -> Result<Self, AppError> {
        let registry = Self { pool };
        registry.init_schema().await?;
        Ok(registry)
    }

    pub async fn init_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS models (
                model_id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                provider TEXT,
                skill_level INTEGER,
                enabled BOOLEAN NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_entry(row: &SqliteRow) -> Result<ModelEntry, sqlx::Error> {
        Ok(ModelEntry {
            model_id: row.try_get("model_id")?,
            name: row.try_get("name")?,
            kind: row.try_get("kind")?,
            provider: row.try_get("provider")?,
            skill_level: row.try_get("skill_level")?,
            enabled: row.try_get("enabled")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl ModelRegistry for SqliteModelRegistry {
    #[instrument(skip(self, entry), fields(model_id = %entry.model_id))]
    async fn add_model(&self, entry: &ModelEntry) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO models (model_id, name, kind, provider, skill_level, enabled, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.model_id)
        .bind(&entry.name)
        .bind(&entry.kind)
        .bind(&entry.provider)
        .bind(entry.skill_level)
        .bind(entry.enabled)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                warn!("Model already registered");
                already_registered(&entry.model_id)
            }
            _ => {
                warn!(error = %e, "Failed to register model");
                AppError::from(e)
            }
        })?;
        debug!("Model registered");
        Ok(())
    }

    async fn find_model(&self, model_id: &str) -> Result<Option<ModelEntry>, AppError> {
        let sql = format!("SELECT {} FROM models WHERE model_id = ?", MODEL_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(model_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref()
            .map(Self::row_to_entry)
            .transpose()
            .map_err(AppError::from)
    }

    async fn list_models(&self) -> Result<Vec<ModelEntry>, AppError> {
        let sql = format!("SELECT {} FROM models ORDER BY model_id", MODEL_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter()
            .map(Self::row_to_entry)
            .collect::<Result<Vec<_>, _>>()
            .map_err(AppError::from)
    }

    /// Read-modify-write inside one transaction
    async fn update_model(
        &self,
        model_id: &str,
        update: &ModelUpdate,
    ) -> Result<ModelEntry, AppError> {
        let mut tx = self.pool.begin().await?;
        let sql = format!("SELECT {} FROM models WHERE model_id = ?", MODEL_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(model_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| model_not_found(model_id))?;
        let mut entry = Self::row_to_entry(&row)?;
        entry.apply(update);

        sqlx::query(
            "UPDATE models SET name = ?, kind = ?, provider = ?, skill_level = ?, enabled = ?
             WHERE model_id = ?",
        )
        .bind(&entry.name)
        .bind(&entry.kind)
        .bind(&entry.provider)
        .bind(entry.skill_level)
        .bind(entry.enabled)
        .bind(model_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(entry)
    }

    async fn remove_model(&self, model_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM models WHERE model_id = ?")
            .bind(model_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(model_not_found(model_id));
        }
        Ok(())
    }
}
