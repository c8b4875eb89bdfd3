use serde::{Deserialize, Serialize};

/// Body shared by the POST expert endpoints; each reads the field it needs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpertRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub fen: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ExpertResponse {
    pub response: String,
}
