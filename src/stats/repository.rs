use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use super::{GameOutcome, GameResult, PlayerStats, StatsError};

#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn record_game(&self, game_result: GameResult) -> Result<(), StatsError>;
    async fn get_player_stats(&self, player: &str) -> Result<Option<PlayerStats>, StatsError>;
    /// All players, ordered by name
    async fn list_player_stats(&self) -> Result<Vec<PlayerStats>, StatsError>;
}

#[derive(Debug, Default)]
pub struct InMemoryStatsRepository {
    players: Arc<RwLock<BTreeMap<String, PlayerStats>>>,
}

impl InMemoryStatsRepository {
    pub fn new() -> Self {
        Self {
            players: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

/// Credits one finished game to both players
fn apply_result(
    players: &mut BTreeMap<String, PlayerStats>,
    game_result: &GameResult,
) -> Result<(), StatsError> {
    if game_result.white.trim().is_empty() || game_result.black.trim().is_empty() {
        return Err(StatsError::Validation(
            "Both players need a name to record a result".to_string(),
        ));
    }

    // Same name on both sides (e.g. random vs random) still counts per side
    for (name, is_white) in [(&game_result.white, true), (&game_result.black, false)] {
        let stats = players
            .entry(name.clone())
            .or_insert_with(|| PlayerStats::new(name));

        match (game_result.outcome, is_white) {
            (GameOutcome::Draw, _) => stats.record_draw(),
            (GameOutcome::WhiteWins, true) | (GameOutcome::BlackWins, false) => {
                stats.record_win()
            }
            _ => stats.record_loss(),
        }
    }

    debug!(
        game_id = %game_result.game_id,
        white = %game_result.white,
        black = %game_result.black,
        outcome = ?game_result.outcome,
        "Recorded game result"
    );
    Ok(())
}

#[async_trait]
impl StatsRepository for InMemoryStatsRepository {
    async fn record_game(&self, game_result: GameResult) -> Result<(), StatsError> {
        let mut players = self.players.write().await;
        apply_result(&mut players, &game_result)
    }

    async fn get_player_stats(&self, player: &str) -> Result<Option<PlayerStats>, StatsError> {
        let players = self.players.read().await;
        Ok(players.get(player).cloned())
    }

    async fn list_player_stats(&self) -> Result<Vec<PlayerStats>, StatsError> {
        let players = self.players.read().await;
        Ok(players.values().cloned().collect())
    }
}

/// File name of the stats snapshot inside the game log directory
pub const STATS_FILE: &str = "player_stats.json";

/// Stats held in memory and written through to a JSON file (player name to
/// record) after every finished game, so they survive a restart alongside
/// the move logs.
pub struct FileStatsRepository {
    path: PathBuf,
    players: RwLock<BTreeMap<String, PlayerStats>>,
}

impl FileStatsRepository {
    /// Loads the snapshot at `path`. A missing file starts empty; an
    /// unreadable one is an error rather than something to overwrite.
    #[instrument]
    pub async fn open(path: PathBuf) -> Result<Self, StatsError> {
        let players = match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| StatsError::Storage(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StatsError::Storage(e.to_string())),
        };
        info!(players = players.len(), "Player stats loaded");
        Ok(Self {
            path,
            players: RwLock::new(players),
        })
    }

    /// Writes a temp file and renames it over the snapshot, so a crash
    /// mid-write leaves the previous snapshot intact
    async fn save(&self, players: &BTreeMap<String, PlayerStats>) -> Result<(), StatsError> {
        let storage = |e: io::Error| StatsError::Storage(e.to_string());
        let json = serde_json::to_string_pretty(players)
            .map_err(|e| StatsError::Storage(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(storage)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(storage)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(storage)
    }
}

#[async_trait]
impl StatsRepository for FileStatsRepository {
    async fn record_game(&self, game_result: GameResult) -> Result<(), StatsError> {
        // Held across the save so snapshots land in the order games finish
        let mut players = self.players.write().await;
        apply_result(&mut players, &game_result)?;
        self.save(&players).await
    }

    async fn get_player_stats(&self, player: &str) -> Result<Option<PlayerStats>, StatsError> {
        Ok(self.players.read().await.get(player).cloned())
    }

    async fn list_player_stats(&self) -> Result<Vec<PlayerStats>, StatsError> {
        Ok(self.players.read().await.values().cloned().collect())
    }
}
