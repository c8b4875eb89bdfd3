use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};

use super::types::{Agent, AgentError};
use crate::game::GamePosition;

const MAX_ATTEMPTS: usize = 3;

/// Client for an OpenAI-compatible chat-completions API (OpenRouter by
/// default), shared by model agents and the expert endpoints
#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

impl ChatClient {
    pub fn new(http: reqwest::Client, api_base: String, api_key: Option<String>) -> Self {
        Self {
            http,
            api_base,
            api_key,
        }
    }

    /// One completion: a system message, a user prompt, the first choice's
    /// text back
    pub async fn complete(
        &self,
        model: &str,
        system: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, AgentError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AgentError::Unavailable("no model API key configured".to_string()))?;

        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        let body = json!({
            "model": model,
            "messages": [
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(system.to_string()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(prompt.to_string()),
                },
            ],
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        let completion: ChatCompletion = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AgentError::BadReply("empty completion".to_string()))
    }
}

/// The model is shown the FEN and the legal moves and must answer with one
/// of them.
pub struct ModelAgent {
    chat: ChatClient,
    model: String,
    strategy: Option<String>,
}

impl ModelAgent {
    pub fn new(chat: ChatClient, model: String, strategy: Option<String>) -> Self {
        Self {
            chat,
            model,
            strategy,
        }
    }

    fn prompt(&self, position: &GamePosition, legal: &[String]) -> String {
        let strategy = self
            .strategy
            .as_deref()
            .map(|s| format!(" Your designated strategy is: {}.", s))
            .unwrap_or_default();
        format!(
            "You are a deterministic chess move selector.{}\n\
             The current board state in FEN is:\n{}\n\n\
             The legal moves are: {}.\n\
             Select the best move from the list of legal moves.\n\
             Respond with only the chosen move in UCI notation (e.g., 'e2e4').",
            strategy,
            position.fen(),
            legal.join(", ")
        )
    }

    async fn ask(&self, prompt: &str) -> Result<String, AgentError> {
        self.chat
            .complete(
                &self.model,
                "You are a helpful chess assistant that provides moves in UCI format.",
                prompt,
                0.5,
                10,
            )
            .await
    }
}

/// Strips the quoting and punctuation models like to wrap moves in
fn normalize_reply(reply: &str) -> String {
    reply
        .trim()
        .trim_matches(|c: char| matches!(c, '\'' | '"' | '`' | '.'))
        .trim()
        .to_ascii_lowercase()
}

#[async_trait]
impl Agent for ModelAgent {
    #[instrument(skip(self, position), fields(model = %self.model))]
    async fn propose_move(&self, position: &GamePosition) -> Result<String, AgentError> {
        if self.chat.api_key.is_none() {
            return Err(AgentError::Unavailable(
                "no model API key configured".to_string(),
            ));
        }

        let legal = position.legal_moves_uci();
        if legal.is_empty() {
            return Err(AgentError::NoLegalMoves);
        }
        let prompt = self.prompt(position, &legal);

        let mut last_error = AgentError::BadReply("no attempts made".to_string());
        for attempt in 1..=MAX_ATTEMPTS {
            match self.ask(&prompt).await {
                Ok(reply) => {
                    let candidate = normalize_reply(&reply);
                    if legal.contains(&candidate) {
                        info!(attempt, chosen = %candidate, "Model chose a move");
                        return Ok(candidate);
                    }
                    warn!(attempt, reply = %reply, "Model returned an illegal move");
                    last_error = AgentError::BadReply(reply);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Model API call failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    fn name(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(api_base: &str, api_key: Option<&str>) -> ChatClient {
        ChatClient::new(
            reqwest::Client::new(),
            api_base.to_string(),
            api_key.map(str::to_string),
        )
    }

    fn agent(api_key: Option<&str>) -> ModelAgent {
        ModelAgent::new(
            chat("http://127.0.0.1:9", api_key),
            "openai/gpt-3.5-turbo".to_string(),
            Some("play the London system".to_string()),
        )
    }

    /// Serves a canned chat completion on a local port and returns its base URL
    async fn fake_api(reply: &'static str) -> String {
        use axum::{routing::post, Json, Router};

        let app = Router::new().route(
            "/chat/completions",
            post(move || async move {
                Json(json!({"choices": [{"message": {"role": "assistant", "content": reply}}]}))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_normalize_reply() {
        assert_eq!(normalize_reply(" 'E2E4'. "), "e2e4");
        assert_eq!(normalize_reply("`g1f3`"), "g1f3");
        assert_eq!(normalize_reply("e7e8q"), "e7e8q");
    }

    #[test]
    fn test_prompt_lists_fen_and_moves() {
        let position = GamePosition::new();
        let legal = position.legal_moves_uci();
        let prompt = agent(None).prompt(&position, &legal);
        assert!(prompt.contains(&position.fen()));
        assert!(prompt.contains("e2e4"));
        assert!(prompt.contains("play the London system"));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_unavailable() {
        let result = agent(None).propose_move(&GamePosition::new()).await;
        assert!(matches!(result, Err(AgentError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_model_reply_is_normalized_and_checked() {
        let base = fake_api(" 'E2E4' ").await;
        let agent = ModelAgent::new(chat(&base, Some("key")), "test/model".to_string(), None);
        assert_eq!(agent.propose_move(&GamePosition::new()).await.unwrap(), "e2e4");

        let base = fake_api("e2e5").await;
        let agent = ModelAgent::new(chat(&base, Some("key")), "test/model".to_string(), None);
        let result = agent.propose_move(&GamePosition::new()).await;
        assert!(matches!(result, Err(AgentError::BadReply(_))));
    }

    #[tokio::test]
    async fn test_chat_client_needs_a_key() {
        let result = chat("http://127.0.0.1:9", None)
            .complete("m", "system", "hello", 0.7, 50)
            .await;
        assert!(matches!(result, Err(AgentError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_unreachable_api_fails_after_retries() {
        let result = agent(Some("key")).propose_move(&GamePosition::new()).await;
        assert!(matches!(result, Err(AgentError::Http(_))));
    }
}
