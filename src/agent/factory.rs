use std::sync::Arc;

use super::{
    engine::EngineAgent,
    human::HumanAgent,
    model::{ChatClient, ModelAgent},
    random::RandomAgent,
    types::{Agent, AgentConfig},
};
use crate::config::AgentSettings;
use crate::registry::ModelRegistry;
use crate::shared::AppError;

/// Builds agents from per-request configuration plus server-side settings.
/// Engine path and API credentials only ever come from the settings.
pub struct AgentFactory {
    settings: AgentSettings,
    chat: ChatClient,
    registry: Arc<dyn ModelRegistry>,
}

impl AgentFactory {
    pub fn new(settings: AgentSettings, registry: Arc<dyn ModelRegistry>) -> Self {
        let chat = ChatClient::new(
            reqwest::Client::new(),
            settings.model_api_base.clone(),
            settings.model_api_key.clone(),
        );
        Self {
            settings,
            chat,
            registry,
        }
    }

    /// Chat client over the configured model API
    pub fn chat_client(&self) -> ChatClient {
        self.chat.clone()
    }

    /// A model chosen by a client must be registered and enabled. Other
    /// agent kinds need no approval.
    pub async fn ensure_enabled(&self, config: &AgentConfig) -> Result<(), AppError> {
        let model_id = match config {
            AgentConfig::Model { model, .. } => {
                model.as_deref().unwrap_or(&self.settings.default_model)
            }
            _ => return Ok(()),
        };
        match self.registry.find_model(model_id).await? {
            Some(entry) if entry.enabled => Ok(()),
            _ => Err(AppError::BadRequest(format!(
                "Model '{}' is not enabled",
                model_id
            ))),
        }
    }

    /// Create an agent instance for the given configuration
    pub fn create_agent(&self, config: &AgentConfig) -> Arc<dyn Agent> {
        match config {
            AgentConfig::Engine {
                skill_level,
                movetime_ms,
            } => Arc::new(EngineAgent::new(
                self.settings.engine_path.clone(),
                *skill_level,
                movetime_ms.unwrap_or(self.settings.engine_movetime_ms),
            )),
            AgentConfig::Model { model, strategy } => Arc::new(ModelAgent::new(
                self.chat.clone(),
                model
                    .clone()
                    .unwrap_or_else(|| self.settings.default_model.clone()),
                strategy.clone(),
            )),
            AgentConfig::Random => Arc::new(RandomAgent::new()),
            AgentConfig::Human => Arc::new(HumanAgent),
        }
    }
}
