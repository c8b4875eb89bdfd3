use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who won a finished game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    WhiteWins,
    BlackWins,
    Draw,
}

impl GameOutcome {
    /// Parses a PGN-style result string (`1-0`, `0-1`, `1/2-1/2`)
    pub fn from_result(result: &str) -> Option<Self> {
        match result {
            "1-0" => Some(GameOutcome::WhiteWins),
            "0-1" => Some(GameOutcome::BlackWins),
            "1/2-1/2" => Some(GameOutcome::Draw),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameResult {
    pub game_id: String,
    pub white: String,
    pub black: String,
    pub outcome: GameOutcome,
    pub completed_at: DateTime<Utc>,
}

/// Running record for one player name, human or agent
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlayerStats {
    pub player: String,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub current_win_streak: u32,
    pub best_win_streak: u32,
}

impl PlayerStats {
    pub fn new(player: &str) -> Self {
        Self {
            player: player.to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn record_win(&mut self) {
        self.games_played += 1;
        self.wins += 1;
        self.current_win_streak += 1;
        self.best_win_streak = self.best_win_streak.max(self.current_win_streak);
    }

    pub(crate) fn record_loss(&mut self) {
        self.games_played += 1;
        self.losses += 1;
        self.current_win_streak = 0;
    }

    pub(crate) fn record_draw(&mut self) {
        self.games_played += 1;
        self.draws += 1;
        self.current_win_streak = 0;
    }
}
