use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::{
    models::{GameSession, GameView, PlayerSlot},
    move_log::{GameHeader, MoveLog, PRACTICE_LOG},
    position::{AppliedMove, GamePosition, GameStatus},
    repository::GameRepository,
    types::{CreateGameRequest, MoveResponse},
};
use crate::agent::{random_legal_move, AgentConfig, AgentError, AgentFactory};
use crate::shared::AppError;
use crate::stats::{GameOutcome, GameResult, PlayerStats, StatsRepository};
use crate::user::UserRepository;

/// A move chosen by an agent (or by the random fallback) and played
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub applied: AppliedMove,
    pub actor: String,
    pub fell_back: bool,
}

/// Move orchestration: validate, apply, log, optionally let an agent reply
pub struct GameService {
    users: Arc<dyn UserRepository + Send + Sync>,
    stats: Arc<dyn StatsRepository>,
    agents: AgentFactory,
    move_log: MoveLog,
    games: GameRepository,
    default_agent: AgentConfig,
    agent_timeout: Duration,
}

fn game_over(status: GameStatus) -> AppError {
    AppError::GameOver(format!("Game is over ({})", status))
}

fn log_failure(game_id: &str, e: std::io::Error) {
    warn!(game_id = %game_id, error = %e, "Failed to write move log");
}

const MAX_NAME_LEN: usize = 64;

/// Names, model ids and strategies are written into line-oriented move logs
fn check_log_text(what: &str, value: &str) -> Result<(), AppError> {
    if value.chars().any(char::is_control) {
        return Err(AppError::BadRequest(format!(
            "{} must not contain control characters",
            what
        )));
    }
    Ok(())
}

fn check_agent_config(config: &AgentConfig) -> Result<(), AppError> {
    if let AgentConfig::Model { model, strategy } = config {
        if let Some(model) = model {
            check_log_text("Model id", model)?;
        }
        if let Some(strategy) = strategy {
            check_log_text("Strategy", strategy)?;
        }
    }
    Ok(())
}

fn check_slot(slot: &PlayerSlot) -> Result<(), AppError> {
    match slot {
        PlayerSlot::Human { name } => {
            if name.trim().is_empty() {
                return Err(AppError::BadRequest("Human players need a name".to_string()));
            }
            if name.chars().count() > MAX_NAME_LEN {
                return Err(AppError::BadRequest(format!(
                    "Player names are limited to {} characters",
                    MAX_NAME_LEN
                )));
            }
            check_log_text("Player name", name)
        }
        PlayerSlot::Agent { config } => check_agent_config(config),
    }
}

impl GameService {
    pub fn new(
        users: Arc<dyn UserRepository + Send + Sync>,
        stats: Arc<dyn StatsRepository>,
        agents: AgentFactory,
        move_log: MoveLog,
        default_agent: AgentConfig,
        agent_timeout: Duration,
    ) -> Self {
        Self {
            users,
            stats,
            agents,
            move_log,
            games: GameRepository::new(),
            default_agent,
            agent_timeout,
        }
    }

    pub fn move_log(&self) -> &MoveLog {
        &self.move_log
    }

    /// Asks the agent for a move under the timeout and plays it. Any agent
    /// failure degrades to a uniformly random legal move.
    #[instrument(skip(self, position))]
    pub async fn agent_reply(
        &self,
        position: &mut GamePosition,
        config: &AgentConfig,
    ) -> Result<AgentReply, AppError> {
        let agent = self.agents.create_agent(config);
        let name = agent.name();

        let proposal = match tokio::time::timeout(self.agent_timeout, agent.propose_move(position))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(AgentError::Timeout),
        };

        let failure = match proposal {
            Ok(mv) => match position.apply(&mv) {
                Ok(applied) => {
                    info!(agent = %name, uci = %applied.uci, "Agent move applied");
                    return Ok(AgentReply {
                        applied,
                        actor: name,
                        fell_back: false,
                    });
                }
                Err(e) => AgentError::BadReply(e.to_string()),
            },
            Err(e) => e,
        };

        warn!(agent = %name, error = %failure, "Agent failed, falling back to a random move");
        let mv = random_legal_move(position).ok_or_else(|| {
            warn!("No legal move available for the fallback");
            AppError::Internal
        })?;
        let applied = position.apply(&mv)?;
        Ok(AgentReply {
            applied,
            actor: format!("{} (random fallback)", name),
            fell_back: true,
        })
    }

    /// Stateless move: the caller owns the position, moves go to the
    /// practice log
    #[instrument(skip(self, fen, agent_config))]
    pub async fn submit_move(
        &self,
        actor: &str,
        fen: &str,
        move_text: &str,
        request_ai_move: bool,
        agent_config: Option<AgentConfig>,
    ) -> Result<MoveResponse, AppError> {
        if let Some(config) = &agent_config {
            check_agent_config(config)?;
            self.agents.ensure_enabled(config).await?;
        }

        let mut position = GamePosition::from_fen(fen)?;
        let status = position.status();
        if status.is_terminal() {
            return Err(game_over(status));
        }

        let number = position.fullmoves();
        let applied = position.apply(move_text)?;
        if let Err(e) = self
            .move_log
            .record_move(PRACTICE_LOG, number, &applied, actor)
            .await
        {
            log_failure(PRACTICE_LOG, e);
        }

        let mut ai_move = None;
        if request_ai_move && !position.status().is_terminal() {
            let config = agent_config.unwrap_or_else(|| self.default_agent.clone());
            let number = position.fullmoves();
            let reply = self.agent_reply(&mut position, &config).await?;
            if let Err(e) = self
                .move_log
                .record_move(PRACTICE_LOG, number, &reply.applied, &reply.actor)
                .await
            {
                log_failure(PRACTICE_LOG, e);
            }
            ai_move = Some(reply.applied);
        }

        let status = position.status();
        info!(uci = %applied.uci, status = %status, "Move processed");
        Ok(MoveResponse {
            success: true,
            fen: position.fen(),
            applied,
            ai_move,
            status,
            check: position.is_check(),
            result: position.result().map(str::to_string),
        })
    }

    fn slot_name(&self, slot: &PlayerSlot) -> String {
        match slot {
            PlayerSlot::Human { name } => name.clone(),
            PlayerSlot::Agent { config } => self.agents.create_agent(config).name(),
        }
    }

    #[instrument(skip(self, request))]
    pub async fn create_game(
        &self,
        owner: &str,
        request: CreateGameRequest,
    ) -> Result<GameView, AppError> {
        for slot in [&request.white, &request.black] {
            check_slot(slot)?;
            if let Some(config) = slot.agent_config() {
                self.agents.ensure_enabled(config).await?;
            }
        }

        let position = match request.fen.as_deref() {
            Some(fen) => GamePosition::from_fen(fen)?,
            None => GamePosition::new(),
        };

        let now = Utc::now();
        let session = GameSession {
            id: uuid::Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            white_name: self.slot_name(&request.white),
            black_name: self.slot_name(&request.black),
            white: request.white,
            black: request.black,
            status: position.status(),
            result: position.result().map(str::to_string),
            position,
            move_count: 0,
            last_move: None,
            created_at: now,
            last_activity: now,
        };

        self.move_log
            .start_game(
                &session.id,
                &GameHeader {
                    owner: session.owner.clone(),
                    white: session.white_name.clone(),
                    black: session.black_name.clone(),
                    white_key: session.white.key(),
                    black_key: session.black.key(),
                    white_config: Some(session.white.config_line()),
                    black_config: Some(session.black.config_line()),
                    initial_fen: session.position.fen(),
                },
            )
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to create game log");
                AppError::Internal
            })?;

        self.users.increment_games_count(owner).await?;

        let view = session.view();
        if self.games.insert(session).await.is_none() {
            warn!(game_id = %view.id, "Generated game id already in use");
            return Err(AppError::Internal);
        }
        let active_games = self.active_games().await;
        info!(
            game_id = %view.id,
            white = %view.white_name,
            black = %view.black_name,
            active_games,
            "Game created"
        );
        Ok(view)
    }

    async fn session(&self, game_id: &str) -> Result<Arc<tokio::sync::Mutex<GameSession>>, AppError> {
        self.games
            .get(game_id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("Game '{}' not found", game_id)))
    }

    /// Games are private to their creator, reads included
    pub async fn get_game(&self, game_id: &str, username: &str) -> Result<GameView, AppError> {
        let handle = self.session(game_id).await?;
        let session = handle.lock().await;
        Self::ensure_owner(&session.id, &session.owner, username)?;
        Ok(session.view())
    }

    fn ensure_owner(game_id: &str, owner: &str, username: &str) -> Result<(), AppError> {
        if owner != username {
            warn!(game_id = %game_id, username = %username, "Non-owner refused");
            return Err(AppError::Forbidden(
                "Only the player who created this game can use it".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn active_games(&self) -> usize {
        self.games.len().await
    }

    /// Evicts sessions idle past their threshold. Their logs remain, so
    /// they can be resumed later.
    pub async fn remove_stale_games(
        &self,
        now: DateTime<Utc>,
        idle_threshold: Duration,
        finished_threshold: Duration,
    ) -> usize {
        let removed = self
            .games
            .remove_stale(now, idle_threshold, finished_threshold)
            .await;
        for game_id in &removed {
            debug!(game_id = %game_id, "Evicted stale game session");
        }
        removed.len()
    }

    /// Logs an applied move on a session and settles the game if it ended
    async fn commit(&self, session: &mut GameSession, applied: AppliedMove, actor: &str) {
        session.move_count += 1;
        session.last_activity = Utc::now();
        if let Err(e) = self
            .move_log
            .record_move(&session.id, session.move_count, &applied, actor)
            .await
        {
            log_failure(&session.id, e);
        }
        session.last_move = Some(applied);
        session.status = session.position.status();

        if session.status.is_terminal() {
            self.finish(session).await;
        }
    }

    async fn finish(&self, session: &mut GameSession) {
        let result = match session.position.result() {
            Some(result) => result,
            None => return,
        };
        session.result = Some(result.to_string());

        if let Err(e) = self
            .move_log
            .record_game_over(&session.id, result, session.status)
            .await
        {
            log_failure(&session.id, e);
        }

        if let Some(outcome) = GameOutcome::from_result(result) {
            let recorded = self
                .stats
                .record_game(GameResult {
                    game_id: session.id.clone(),
                    white: session.white_name.clone(),
                    black: session.black_name.clone(),
                    outcome,
                    completed_at: Utc::now(),
                })
                .await;
            if let Err(e) = recorded {
                warn!(game_id = %session.id, error = %e, "Failed to record player stats");
            }
        }

        info!(game_id = %session.id, result = %result, status = %session.status, "Game over");
    }

    /// A human move on a session, optionally answered by an agent opponent
    #[instrument(skip(self))]
    pub async fn play_move(
        &self,
        game_id: &str,
        username: &str,
        move_text: &str,
        request_ai_move: bool,
    ) -> Result<GameView, AppError> {
        let handle = self.session(game_id).await?;
        let mut session = handle.lock().await;
        Self::ensure_owner(&session.id, &session.owner, username)?;

        if session.status.is_terminal() {
            return Err(game_over(session.status));
        }
        if session.slot_to_move().is_agent() {
            return Err(AppError::BadRequest(
                "It is the agent's turn; request an agent move instead".to_string(),
            ));
        }

        let actor = session.name_to_move().to_string();
        let applied = session.position.apply(move_text)?;
        self.commit(&mut session, applied, &actor).await;

        if request_ai_move && !session.status.is_terminal() {
            if let Some(config) = session.slot_to_move().agent_config().cloned() {
                let reply = self.agent_reply(&mut session.position, &config).await?;
                self.commit(&mut session, reply.applied, &reply.actor).await;
            }
        }

        Ok(session.view())
    }

    /// Lets the agent on move play, used to step agent-vs-agent games
    #[instrument(skip(self))]
    pub async fn agent_move(&self, game_id: &str, username: &str) -> Result<GameView, AppError> {
        let handle = self.session(game_id).await?;
        let mut session = handle.lock().await;
        Self::ensure_owner(&session.id, &session.owner, username)?;

        if session.status.is_terminal() {
            return Err(game_over(session.status));
        }
        let config = session
            .slot_to_move()
            .agent_config()
            .cloned()
            .ok_or_else(|| {
                AppError::BadRequest("It is a human player's turn".to_string())
            })?;

        let reply = self.agent_reply(&mut session.position, &config).await?;
        self.commit(&mut session, reply.applied, &reply.actor).await;
        Ok(session.view())
    }

    /// Rebuilds a session from its move log. The last logged FEN replaces
    /// the position wholesale. Only the account named in the log may resume
    /// it, and never while the game is still live.
    #[instrument(skip(self))]
    pub async fn resume_game(&self, game_id: &str, owner: &str) -> Result<GameView, AppError> {
        let valid_id = !game_id.is_empty()
            && game_id != PRACTICE_LOG
            && game_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid_id {
            return Err(AppError::BadRequest("Invalid game id".to_string()));
        }

        let logged = self
            .move_log
            .load(game_id)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to read game log");
                AppError::Internal
            })?
            .ok_or_else(|| AppError::NotFound(format!("No saved game '{}'", game_id)))?;

        let header = &logged.header;
        Self::ensure_owner(game_id, &header.owner, owner)?;

        let white = PlayerSlot::from_log(
            header.white_config.as_deref(),
            &header.white_key,
            &header.white,
        );
        let black = PlayerSlot::from_log(
            header.black_config.as_deref(),
            &header.black_key,
            &header.black,
        );
        let (white, black) = match (white, black) {
            (Some(white), Some(black)) => (white, black),
            _ => {
                return Err(AppError::BadRequest(
                    "Saved game names an unknown player type".to_string(),
                ))
            }
        };
        for slot in [&white, &black] {
            if let Some(config) = slot.agent_config() {
                self.agents.ensure_enabled(config).await?;
            }
        }

        let position = GamePosition::from_fen(&logged.last_fen)?;
        let status = position.status();
        let result = logged
            .result
            .clone()
            .or_else(|| position.result().map(str::to_string));
        let now = Utc::now();
        let session = GameSession {
            id: game_id.to_string(),
            owner: header.owner.clone(),
            white,
            black,
            white_name: header.white.clone(),
            black_name: header.black.clone(),
            status,
            result,
            position,
            move_count: logged.move_count,
            last_move: None,
            created_at: now,
            last_activity: now,
        };

        let view = session.view();
        if self.games.insert(session).await.is_none() {
            warn!(game_id = %game_id, "Resume of a live game refused");
            return Err(AppError::Conflict(format!(
                "Game '{}' is already in progress",
                game_id
            )));
        }
        info!(
            game_id = %game_id,
            move_count = view.move_count,
            finished = view.result.is_some(),
            "Game resumed from log"
        );
        Ok(view)
    }

    pub async fn player_stats(&self) -> Result<Vec<PlayerStats>, AppError> {
        Ok(self.stats.list_player_stats().await?)
    }

    pub async fn stats_for(&self, player: &str) -> Result<PlayerStats, AppError> {
        self.stats
            .get_player_stats(player)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No stats for '{}'", player)))
    }
}
