use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database model for the `users` table
#[derive(Debug, Clone)]
pub struct UserModel {
    pub id: i64,
    pub username: String, // Stored lowercase
    pub email: String,
    pub password_hash: String, // Argon2 PHC string, salt included
    pub is_admin: bool,
    pub is_verified: bool,
    pub verification_token: Option<String>,
    pub games_count: i64,
    pub created_at: DateTime<Utc>,
}

impl UserModel {
    /// Public view of the record, never carrying the password hash
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            is_admin: self.is_admin,
            is_verified: self.is_verified,
            games_count: self.games_count,
            created_at: self.created_at,
        }
    }
}

/// Fields needed to insert a new user row
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub is_verified: bool,
    pub verification_token: Option<String>,
}

impl NewUser {
    pub fn new(username: &str, email: &str, password_hash: String) -> Self {
        Self {
            username: username.trim().to_lowercase(),
            email: email.trim().to_string(),
            password_hash,
            is_admin: false,
            is_verified: false,
            verification_token: None,
        }
    }

    pub(crate) fn into_model(self, id: i64) -> UserModel {
        UserModel {
            id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            is_admin: self.is_admin,
            is_verified: self.is_verified,
            verification_token: self.verification_token,
            games_count: 0,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub is_verified: bool,
    pub games_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Aggregate counts over the credential store
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserCounts {
    pub total_users: i64,
    pub admins: i64,
    pub verified: i64,
    pub total_games: i64,
}
