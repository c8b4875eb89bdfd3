use tracing::{info, instrument, warn};

use crate::agent::ChatClient;
use crate::game::GamePosition;
use crate::shared::AppError;

const SYSTEM_PROMPT: &str =
    "You are a chess expert. Answer accurately and concisely in plain text.";
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 400;

const FACT_PROMPT: &str = "Give me a unique chess fact or piece of trivia. \
     Do not repeat facts about the Queen's movement. \
     You may share a historical event, a famous player's achievement, a record, a rule, \
     or something from recent chess news.";
const OPENING_PROMPT: &str = "Give practical advice for chess openings. \
     Include general principles, common mistakes, and tips for improvement.";
const NEWS_PROMPT: &str = "Provide the latest news in the world of chess. \
     Include updates on tournaments, players, and other significant events.";

/// Shown by `/expert/ask` when no question is given
pub const ASK_MENU: &str = "Ask the Chess Expert:\n\
     \x20 1: Ask a chess question\n\
     \x20 2: Tell me a chess joke\n\
     \x20 3: Tell me some chess news\n\
     Please provide your choice or question.";

/// Free-text chess help from the configured expert model
pub struct ExpertService {
    chat: ChatClient,
    model: String,
}

impl ExpertService {
    pub fn new(chat: ChatClient, model: String) -> Self {
        Self { chat, model }
    }

    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn consult(&self, topic: &'static str, prompt: &str) -> Result<String, AppError> {
        match self
            .chat
            .complete(&self.model, SYSTEM_PROMPT, prompt, TEMPERATURE, MAX_TOKENS)
            .await
        {
            Ok(answer) => {
                info!(topic, "Expert answered");
                Ok(answer.trim().to_string())
            }
            Err(e) => {
                warn!(topic, error = %e, "Expert model call failed");
                Err(AppError::Upstream(e.to_string()))
            }
        }
    }

    pub async fn question(&self, question: Option<&str>) -> Result<String, AppError> {
        let question = question
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| AppError::BadRequest("No question provided.".to_string()))?;
        self.consult("question", question).await
    }

    /// Like `question`, but a blank question returns the menu instead of an
    /// error
    pub async fn ask(&self, question: Option<&str>) -> Result<String, AppError> {
        match question.map(str::trim).filter(|q| !q.is_empty()) {
            Some(question) => self.consult("ask", question).await,
            None => Ok(ASK_MENU.to_string()),
        }
    }

    pub async fn fact(&self) -> Result<String, AppError> {
        self.consult("fact", FACT_PROMPT).await
    }

    /// The FEN is parsed first so the model never sees a malformed position
    pub async fn analyze(&self, fen: Option<&str>) -> Result<String, AppError> {
        let fen = fen
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .ok_or_else(|| AppError::BadRequest("A FEN is required.".to_string()))?;
        let position = GamePosition::from_fen(fen)?;
        let prompt = format!(
            "Analyze this chess position (FEN): {}\n\
             Give a brief evaluation, best moves for both sides, and any tactical ideas.",
            position.fen()
        );
        self.consult("analyze", &prompt).await
    }

    pub async fn opening(&self) -> Result<String, AppError> {
        self.consult("opening", OPENING_PROMPT).await
    }

    pub async fn news(&self) -> Result<String, AppError> {
        self.consult("news", NEWS_PROMPT).await
    }
}
