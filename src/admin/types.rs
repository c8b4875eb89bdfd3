use serde::{Deserialize, Serialize};

use crate::registry::{ModelEntry, ModelUpdate};
use crate::user::{UserCounts, UserProfile};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct UserListResponse {
    pub success: bool,
    pub admin: String,
    pub total_users: usize,
    pub users: Vec<UserProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SystemStats {
    pub total_users: i64,
    pub admins: i64,
    pub regular_users: i64,
    pub verified: i64,
    pub unverified: i64,
    pub total_games: i64,
}

impl From<UserCounts> for SystemStats {
    fn from(counts: UserCounts) -> Self {
        Self {
            total_users: counts.total_users,
            admins: counts.admins,
            regular_users: counts.total_users - counts.admins,
            verified: counts.verified,
            unverified: counts.total_users - counts.verified,
            total_games: counts.total_games,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StatsResponse {
    pub success: bool,
    pub admin: String,
    pub stats: SystemStats,
}

#[derive(Debug, Deserialize)]
pub struct AddModelRequest {
    pub model_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub skill_level: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveModelRequest {
    pub model_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateModelRequest {
    pub model_id: String,
    #[serde(default)]
    pub updates: ModelUpdate,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ModelListResponse {
    pub success: bool,
    pub admin: String,
    pub models: Vec<ModelEntry>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ModelActionResponse {
    pub success: bool,
    pub message: String,
    pub admin: String,
}
