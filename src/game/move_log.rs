use chrono::Utc;
use std::io;
use std::path::PathBuf;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use super::position::{AppliedMove, GameStatus};

/// Log receiving moves made through the stateless move endpoint
pub const PRACTICE_LOG: &str = "practice";

/// Header lines written when a game starts
#[derive(Debug, Clone, PartialEq)]
pub struct GameHeader {
    /// Account that created the game; only it may resume the log
    pub owner: String,
    pub white: String,
    pub black: String,
    pub white_key: String,
    pub black_key: String,
    /// JSON form of each slot, absent in logs that only carry the keys
    pub white_config: Option<String>,
    pub black_config: Option<String>,
    pub initial_fen: String,
}

/// What a log file says about a game: its players and where it stopped
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedGame {
    pub header: GameHeader,
    pub last_fen: String,
    pub move_count: u32,
    /// Result from the `Game Over` line, if the game was finished
    pub result: Option<String>,
}

/// Flat, append-only move logs, one file per game under a directory
#[derive(Debug, Clone)]
pub struct MoveLog {
    dir: PathBuf,
}

impl MoveLog {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn path_for(&self, game_id: &str) -> PathBuf {
        self.dir.join(format!("{}.log", game_id))
    }

    async fn append(&self, game_id: &str, lines: &[String]) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S");
        let mut text = String::new();
        for line in lines {
            // A record is exactly one line
            let line: String = line
                .chars()
                .map(|c| if c.is_control() { ' ' } else { c })
                .collect();
            text.push_str(&format!("{} - {}\n", timestamp, line));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(game_id))
            .await?;
        // One write per call so concurrent appends to the practice log
        // don't interleave within a record
        file.write_all(text.as_bytes()).await?;
        file.flush().await
    }

    #[instrument(skip(self, header))]
    pub async fn start_game(&self, game_id: &str, header: &GameHeader) -> io::Result<()> {
        let mut lines = vec![
            "New Game Started".to_string(),
            format!("Owner: {}", header.owner),
            format!("White: {}", header.white),
            format!("Black: {}", header.black),
            format!("White Player Key: {}", header.white_key),
            format!("Black Player Key: {}", header.black_key),
        ];
        if let Some(config) = &header.white_config {
            lines.push(format!("White Player Config: {}", config));
        }
        if let Some(config) = &header.black_config {
            lines.push(format!("Black Player Config: {}", config));
        }
        lines.push(format!("Initial FEN: {}", header.initial_fen));

        self.append(game_id, &lines).await?;
        debug!(path = %self.path_for(game_id).display(), "Game log started");
        Ok(())
    }

    pub async fn record_move(
        &self,
        game_id: &str,
        number: u32,
        applied: &AppliedMove,
        actor: &str,
    ) -> io::Result<()> {
        self.append(
            game_id,
            &[format!(
                "Move {}: {} ({}) by {} | FEN: {}",
                number, applied.san, applied.uci, actor, applied.fen
            )],
        )
        .await
    }

    pub async fn record_game_over(
        &self,
        game_id: &str,
        result: &str,
        status: GameStatus,
    ) -> io::Result<()> {
        self.append(game_id, &[format!("Game Over: {} ({})", result, status)])
            .await
    }

    /// Reads a game back from its log. `Ok(None)` when there is no log or
    /// it lacks a complete header.
    #[instrument(skip(self))]
    pub async fn load(&self, game_id: &str) -> io::Result<Option<LoggedGame>> {
        let text = match fs::read_to_string(self.path_for(game_id)).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(parse_log(&text))
    }
}

fn parse_log(text: &str) -> Option<LoggedGame> {
    let mut owner = None;
    let mut white = None;
    let mut black = None;
    let mut white_key = None;
    let mut black_key = None;
    let mut white_config = None;
    let mut black_config = None;
    let mut initial_fen = None;
    let mut last_fen = None;
    let mut move_count = 0;
    let mut result = None;

    for line in text.lines() {
        let body = match line.split_once(" - ") {
            Some((_, body)) => body.trim(),
            None => continue,
        };

        // Longer prefixes first: "White Player Key: " also starts with "White"
        if let Some(value) = body.strip_prefix("White Player Key: ") {
            white_key = Some(value.to_string());
        } else if let Some(value) = body.strip_prefix("Black Player Key: ") {
            black_key = Some(value.to_string());
        } else if let Some(value) = body.strip_prefix("White Player Config: ") {
            white_config = Some(value.to_string());
        } else if let Some(value) = body.strip_prefix("Black Player Config: ") {
            black_config = Some(value.to_string());
        } else if let Some(value) = body.strip_prefix("Owner: ") {
            owner = Some(value.to_string());
        } else if let Some(value) = body.strip_prefix("White: ") {
            white = Some(value.to_string());
        } else if let Some(value) = body.strip_prefix("Black: ") {
            black = Some(value.to_string());
        } else if let Some(value) = body.strip_prefix("Initial FEN: ") {
            initial_fen = Some(value.to_string());
        } else if body.starts_with("Move ") {
            // The FEN is last; an actor name cannot move it
            if let Some((_, fen)) = body.rsplit_once("| FEN: ") {
                last_fen = Some(fen.trim().to_string());
                move_count += 1;
            }
        } else if let Some(value) = body.strip_prefix("Game Over: ") {
            // `Game Over: 1-0 (checkmate)`
            let value = value.split_whitespace().next().unwrap_or(value);
            result = Some(value.to_string());
        }
    }

    let initial_fen = initial_fen?;
    Some(LoggedGame {
        header: GameHeader {
            owner: owner?,
            white: white?,
            black: black?,
            white_key: white_key?,
            black_key: black_key?,
            white_config,
            black_config,
            initial_fen: initial_fen.clone(),
        },
        last_fen: last_fen.unwrap_or(initial_fen),
        move_count,
        result,
    })
}
