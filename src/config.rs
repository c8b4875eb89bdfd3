use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::agent::AgentConfig;
use crate::game::CleanupConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Which HTTP surface this process serves. Each service is its own trust
/// boundary; `All` mounts every router in one process for development.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ServiceKind {
    All,
    Auth,
    Admin,
    Engine,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub kind: ServiceKind,
    pub bind_addr: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiration_hours: i64,
    pub dev_mode: bool,
    pub require_verified_login: bool,
    pub default_admin_password: String,
    pub password_min_length: usize,
    pub password_max_length: usize,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub database_url: String,
    pub game_log_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub engine_path: PathBuf,
    pub engine_movetime_ms: u64,
    pub model_api_base: String,
    pub model_api_key: Option<String>,
    pub default_model: String,
    /// Model behind the `/expert/*` endpoints
    pub expert_model: String,
    pub timeout: Duration,
    pub default_agent: AgentConfig,
}

/// Process configuration, built once at start-up and injected into
/// `AppState`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub agents: AgentSettings,
    pub cleanup: CleanupConfig,
}

impl AppConfig {
    /// Reads configuration from the environment (after loading `.env` if
    /// present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let default_model = env_or("DEFAULT_MODEL", "openai/gpt-3.5-turbo");
        let default_agent = match env::var("DEFAULT_AGENT").ok().as_deref() {
            None | Some("engine") => AgentConfig::Engine {
                skill_level: None,
                movetime_ms: None,
            },
            Some("model") => AgentConfig::Model {
                model: None,
                strategy: None,
            },
            Some("random") => AgentConfig::Random,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "DEFAULT_AGENT",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            service: ServiceConfig {
                kind: parse_env("CHESS_SERVICE", ServiceKind::All)?,
                bind_addr: env_or("BIND_ADDR", "0.0.0.0:8000"),
            },
            auth: AuthConfig {
                jwt_secret: env_or(
                    "JWT_SECRET_KEY",
                    "chess-app-secret-key-change-in-production",
                ),
                token_expiration_hours: parse_env("JWT_EXPIRATION_HOURS", 24)?,
                dev_mode: parse_flag("CHESS_DEV_MODE"),
                require_verified_login: parse_flag("REQUIRE_VERIFIED_LOGIN"),
                default_admin_password: env_or("DEFAULT_ADMIN_PASSWORD", "admin123"),
                password_min_length: parse_env("PASSWORD_MIN_LENGTH", 6)?,
                password_max_length: parse_env("PASSWORD_MAX_LENGTH", 128)?,
            },
            storage: StorageConfig {
                database_url: env_or("DATABASE_URL", "sqlite://data/users.db"),
                game_log_dir: PathBuf::from(env_or("GAME_LOG_DIR", "logs")),
            },
            agents: AgentSettings {
                engine_path: PathBuf::from(env_or("STOCKFISH_EXECUTABLE", "stockfish")),
                engine_movetime_ms: parse_env("ENGINE_MOVETIME_MS", 500)?,
                model_api_base: env_or("MODEL_API_BASE", "https://openrouter.ai/api/v1"),
                model_api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
                expert_model: env_or("EXPERT_MODEL", &default_model),
                default_model,
                timeout: Duration::from_secs(parse_env("AGENT_TIMEOUT_SECS", 10)?),
                default_agent,
            },
            cleanup: CleanupConfig {
                cleanup_interval: Duration::from_secs(parse_env("GAME_CLEANUP_INTERVAL_SECS", 5 * 60)?),
                idle_threshold: Duration::from_secs(parse_env("GAME_IDLE_TTL_SECS", 24 * 60 * 60)?),
                finished_threshold: Duration::from_secs(parse_env("FINISHED_GAME_TTL_SECS", 30 * 60)?),
            },
        })
    }

    /// Configuration for tests: in-memory store, the random agent as
    /// default, dev mode on so registrations are auto-verified.
    pub fn for_tests(game_log_dir: PathBuf) -> Self {
        Self {
            service: ServiceConfig {
                kind: ServiceKind::All,
                bind_addr: "127.0.0.1:0".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: "test-secret".to_string(),
                token_expiration_hours: 24,
                dev_mode: true,
                require_verified_login: false,
                default_admin_password: "admin123".to_string(),
                password_min_length: 6,
                password_max_length: 128,
            },
            storage: StorageConfig {
                database_url: "sqlite::memory:".to_string(),
                game_log_dir,
            },
            agents: AgentSettings {
                engine_path: PathBuf::from("stockfish"),
                engine_movetime_ms: 100,
                model_api_base: "http://127.0.0.1:9".to_string(),
                model_api_key: None,
                default_model: "openai/gpt-3.5-turbo".to_string(),
                expert_model: "openai/gpt-3.5-turbo".to_string(),
                timeout: Duration::from_secs(2),
                default_agent: AgentConfig::Random,
            },
            cleanup: CleanupConfig::default(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn parse_env<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(default),
    }
}
