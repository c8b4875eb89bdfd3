use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An AI opponent an admin has registered. Only enabled entries may be
/// picked by players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Identifier players send, e.g. `openai/gpt-4o`
    pub model_id: String,
    pub name: String,
    /// Free-form family, e.g. `openrouter` or `stockfish`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_level: Option<i64>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl ModelEntry {
    /// New entries start disabled
    pub fn new(
        model_id: &str,
        name: &str,
        kind: &str,
        provider: Option<String>,
        skill_level: Option<i64>,
    ) -> Self {
        Self {
            model_id: model_id.trim().to_string(),
            name: name.trim().to_string(),
            kind: kind.trim().to_string(),
            provider,
            skill_level,
            enabled: false,
            created_at: Utc::now(),
        }
    }

    pub fn apply(&mut self, update: &ModelUpdate) {
        if let Some(name) = &update.name {
            self.name = name.trim().to_string();
        }
        if let Some(kind) = &update.kind {
            self.kind = kind.trim().to_string();
        }
        if let Some(provider) = &update.provider {
            self.provider = Some(provider.clone());
        }
        if let Some(skill_level) = update.skill_level {
            self.skill_level = Some(skill_level);
        }
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
    }
}

/// Partial update; absent fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub skill_level: Option<i64>,
    #[serde(default)]
    pub enabled: Option<bool>,
}
