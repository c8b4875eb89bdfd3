use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use super::models::{NewUser, UserCounts, UserModel};
use crate::shared::AppError;

/// Trait for credential store operations
#[async_trait]
pub trait UserRepository {
    /// Inserts a new row. Fails with `DuplicateIdentity` if the username or
    /// email is taken (case-insensitive).
    async fn create_user(&self, user: &NewUser) -> Result<UserModel, AppError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<UserModel>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError>;
    /// Looks a user up by username or email
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<UserModel>, AppError>;
    async fn find_by_verification_token(&self, token: &str)
        -> Result<Option<UserModel>, AppError>;
    async fn list_users(&self) -> Result<Vec<UserModel>, AppError>;
    async fn update_password(&self, username: &str, password_hash: &str) -> Result<(), AppError>;
    async fn set_admin(&self, username: &str, is_admin: bool) -> Result<(), AppError>;
    /// Marks the user verified and clears any pending verification token
    async fn mark_verified(&self, username: &str) -> Result<(), AppError>;
    async fn delete_user(&self, username: &str) -> Result<(), AppError>;
    async fn increment_games_count(&self, username: &str) -> Result<(), AppError>;
    async fn counts(&self) -> Result<UserCounts, AppError>;
}

fn duplicate_identity() -> AppError {
    AppError::DuplicateIdentity("Username or email already exists.".to_string())
}

fn user_not_found(username: &str) -> AppError {
    AppError::NotFound(format!("User '{}' not found.", username))
}

/// In-memory implementation of UserRepository for development and testing
pub struct InMemoryUserRepository {
    users: RwLock<BTreeMap<i64, UserModel>>,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the current number of users in the repository
    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    async fn find_where<F>(&self, predicate: F) -> Option<UserModel>
    where
        F: Fn(&UserModel) -> bool + Send,
    {
        self.users
            .read()
            .await
            .values()
            .find(|u| predicate(u))
            .cloned()
    }

    async fn update_where<F>(&self, username: &str, update: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut UserModel) + Send,
    {
        let mut users = self.users.write().await;
        match users
            .values_mut()
            .find(|u| u.username.eq_ignore_ascii_case(username))
        {
            Some(user) => {
                update(user);
                Ok(())
            }
            None => {
                warn!(username = %username, "User not found for update in memory");
                Err(user_not_found(username))
            }
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create_user(&self, user: &NewUser) -> Result<UserModel, AppError> {
        let mut users = self.users.write().await;
        let taken = users.values().any(|u| {
            u.username.eq_ignore_ascii_case(&user.username) || u.email.eq_ignore_ascii_case(&user.email)
        });
        if taken {
            warn!("Username or email already exists in memory");
            return Err(duplicate_identity());
        }

        let id = users.keys().next_back().copied().unwrap_or(0) + 1;
        let model = user.clone().into_model(id);
        users.insert(id, model.clone());

        debug!(user_id = id, "User created in memory");
        Ok(model)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserModel>, AppError> {
        Ok(self
            .find_where(|u| u.username.eq_ignore_ascii_case(username))
            .await)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError> {
        Ok(self.find_where(|u| u.email.eq_ignore_ascii_case(email)).await)
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<UserModel>, AppError> {
        Ok(self
            .find_where(|u| {
                u.username.eq_ignore_ascii_case(identifier) || u.email.eq_ignore_ascii_case(identifier)
            })
            .await)
    }

    async fn find_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<UserModel>, AppError> {
        Ok(self
            .find_where(|u| u.verification_token.as_deref() == Some(token))
            .await)
    }

    async fn list_users(&self) -> Result<Vec<UserModel>, AppError> {
        Ok(self.users.read().await.values().cloned().collect())
    }

    async fn update_password(&self, username: &str, password_hash: &str) -> Result<(), AppError> {
        let hash = password_hash.to_string();
        self.update_where(username, |u| u.password_hash = hash).await
    }

    async fn set_admin(&self, username: &str, is_admin: bool) -> Result<(), AppError> {
        self.update_where(username, |u| u.is_admin = is_admin).await
    }

    async fn mark_verified(&self, username: &str) -> Result<(), AppError> {
        self.update_where(username, |u| {
            u.is_verified = true;
            u.verification_token = None;
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, username: &str) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        let id = users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .map(|u| u.id)
            .ok_or_else(|| user_not_found(username))?;
        users.remove(&id);
        debug!(username = %username, "User deleted from memory");
        Ok(())
    }

    async fn increment_games_count(&self, username: &str) -> Result<(), AppError> {
        self.update_where(username, |u| u.games_count += 1).await
    }

    async fn counts(&self) -> Result<UserCounts, AppError> {
        let users = self.users.read().await;
        Ok(UserCounts {
            total_users: users.len() as i64,
            admins: users.values().filter(|u| u.is_admin).count() as i64,
            verified: users.values().filter(|u| u.is_verified).count() as i64,
            total_games: users.values().map(|u| u.games_count).sum(),
        })
    }
}

/// Filesystem path of a `sqlite:` URL, `None` for in-memory databases
fn database_file(database_url: &str) -> Option<&Path> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Some(Path::new(path))
}

const USER_COLUMNS: &str = "id, username, email, password_hash, is_admin, is_verified, \
                            verification_token, games_count, created_at";

/// SQLite implementation of the credential store. Concurrent writers rely
/// on SQLite's own locking; a busy database surfaces as `StoreBusy`.
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The underlying pool, shared with the model registry
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Opens (creating if needed) the database at `database_url` and
    /// ensures the schema exists.
    #[instrument]
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        if let Some(parent) = database_file(database_url).and_then(|file| file.parent()) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    warn!(error = %e, "Failed to create database directory");
                    AppError::DatabaseError(e.to_string())
                })?;
            }
        }

        // An in-memory database only lives as long as its connection
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let repository = Self::new(pool);
        repository.init_schema().await?;
        info!(database_url = %database_url, "Credential store ready");
        Ok(repository)
    }

    pub async fn init_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL COLLATE NOCASE,
                email TEXT UNIQUE NOT NULL COLLATE NOCASE,
                password_hash TEXT NOT NULL,
                is_admin BOOLEAN NOT NULL DEFAULT 0,
                is_verified BOOLEAN NOT NULL DEFAULT 0,
                verification_token TEXT,
                games_count INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_user(row: &SqliteRow) -> Result<UserModel, sqlx::Error> {
        Ok(UserModel {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            is_admin: row.try_get("is_admin")?,
            is_verified: row.try_get("is_verified")?,
            verification_token: row.try_get("verification_token")?,
            games_count: row.try_get("games_count")?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn fetch_one_where(
        &self,
        clause: &str,
        params: &[&str],
    ) -> Result<Option<UserModel>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, clause);
        let mut query = sqlx::query(&sql);
        for param in params {
            query = query.bind(*param);
        }
        let row = query.fetch_optional(&self.pool).await.map_err(|e| {
            warn!(error = %e, "Failed to fetch user from database");
            AppError::from(e)
        })?;
        row.as_ref()
            .map(Self::row_to_user)
            .transpose()
            .map_err(AppError::from)
    }

    fn expect_one_row(rows_affected: u64, username: &str) -> Result<(), AppError> {
        if rows_affected == 0 {
            warn!(username = %username, "User not found for update");
            return Err(user_not_found(username));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create_user(&self, user: &NewUser) -> Result<UserModel, AppError> {
        let created_at = chrono::Utc::now();
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, is_admin, is_verified, verification_token, games_count, created_at)
             VALUES (?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .bind(user.is_verified)
        .bind(&user.verification_token)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                warn!("Username or email already exists in database");
                duplicate_identity()
            }
            _ => {
                warn!(error = %e, "Failed to create user in database");
                AppError::from(e)
            }
        })?;

        let mut model = user.clone().into_model(result.last_insert_rowid());
        model.created_at = created_at;
        debug!(user_id = model.id, "User created in database");
        Ok(model)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserModel>, AppError> {
        self.fetch_one_where("username = ?", &[username]).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError> {
        self.fetch_one_where("email = ?", &[email]).await
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<UserModel>, AppError> {
        self.fetch_one_where("username = ? OR email = ?", &[identifier, identifier])
            .await
    }

    async fn find_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<UserModel>, AppError> {
        self.fetch_one_where("verification_token = ?", &[token]).await
    }

    async fn list_users(&self) -> Result<Vec<UserModel>, AppError> {
        let sql = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter()
            .map(Self::row_to_user)
            .collect::<Result<Vec<_>, _>>()
            .map_err(AppError::from)
    }

    async fn update_password(&self, username: &str, password_hash: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE username = ?")
            .bind(password_hash)
            .bind(username)
            .execute(&self.pool)
            .await?;
        Self::expect_one_row(result.rows_affected(), username)
    }

    async fn set_admin(&self, username: &str, is_admin: bool) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET is_admin = ? WHERE username = ?")
            .bind(is_admin)
            .bind(username)
            .execute(&self.pool)
            .await?;
        Self::expect_one_row(result.rows_affected(), username)
    }

    async fn mark_verified(&self, username: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE users SET is_verified = 1, verification_token = NULL WHERE username = ?",
        )
        .bind(username)
        .execute(&self.pool)
        .await?;
        Self::expect_one_row(result.rows_affected(), username)
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, username: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Self::expect_one_row(result.rows_affected(), username)?;
        debug!(username = %username, "User deleted from database");
        Ok(())
    }

    async fn increment_games_count(&self, username: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET games_count = games_count + 1 WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Self::expect_one_row(result.rows_affected(), username)
    }

    async fn counts(&self) -> Result<UserCounts, AppError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total_users,
                    COALESCE(SUM(CASE WHEN is_admin THEN 1 ELSE 0 END), 0) AS admins,
                    COALESCE(SUM(CASE WHEN is_verified THEN 1 ELSE 0 END), 0) AS verified,
                    COALESCE(SUM(games_count), 0) AS total_games
             FROM users",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(UserCounts {
            total_users: row.try_get("total_users")?,
            admins: row.try_get("admins")?,
            verified: row.try_get("verified")?,
            total_games: row.try_get("total_games")?,
        })
    }
}
