use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use super::models::GameSession;

/// Live game sessions. Each session has its own lock so moves on one game
/// are serialized while other games proceed.
pub struct GameRepository {
    /// A mapping from game ID to session
    games: Arc<RwLock<HashMap<String, Arc<Mutex<GameSession>>>>>,
}

impl Default for GameRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl GameRepository {
    pub fn new() -> Self {
        Self {
            games: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Stores a session under its ID. Returns `None`, leaving the live
    /// session untouched, when the ID is already taken.
    pub async fn insert(&self, session: GameSession) -> Option<Arc<Mutex<GameSession>>> {
        let mut games = self.games.write().await;
        if games.contains_key(&session.id) {
            return None;
        }
        let id = session.id.clone();
        let handle = Arc::new(Mutex::new(session));
        games.insert(id, Arc::clone(&handle));
        Some(handle)
    }

    pub async fn get(&self, game_id: &str) -> Option<Arc<Mutex<GameSession>>> {
        let games = self.games.read().await;
        games.get(game_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.games.read().await.len()
    }

    /// Drops finished sessions idle for `finished_after` and unfinished ones
    /// idle for `idle_after`. A session whose lock is held is mid-move and
    /// always kept. Returns the removed IDs.
    pub async fn remove_stale(
        &self,
        now: DateTime<Utc>,
        idle_after: Duration,
        finished_after: Duration,
    ) -> Vec<String> {
        let mut games = self.games.write().await;
        let stale: Vec<String> = games
            .iter()
            .filter_map(|(id, handle)| {
                let session = handle.try_lock().ok()?;
                let limit = if session.status.is_terminal() {
                    finished_after
                } else {
                    idle_after
                };
                let idle = (now - session.last_activity).to_std().unwrap_or_default();
                (idle >= limit).then(|| id.clone())
            })
            .collect();

        for id in &stale {
            games.remove(id);
        }
        stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentConfig;
    use crate::game::models::PlayerSlot;
    use crate::game::position::{GamePosition, GameStatus};

    fn session(id: &str) -> GameSession {
        let now = Utc::now();
        GameSession {
            id: id.to_string(),
            owner: "alice".to_string(),
            white: PlayerSlot::Human {
                name: "alice".to_string(),
            },
            black: PlayerSlot::Agent {
                config: AgentConfig::Random,
            },
            white_name: "alice".to_string(),
            black_name: "Random".to_string(),
            position: GamePosition::new(),
            status: GameStatus::AwaitingMove,
            result: None,
            move_count: 0,
            last_move: None,
            created_at: now,
            last_activity: now,
        }
    }

    #[tokio::test]
    async fn test_insert_never_replaces_live_session() {
        let repo = GameRepository::new();
        assert!(repo.get("g1").await.is_none());

        repo.insert(session("g1")).await.unwrap();
        let handle = repo.get("g1").await.unwrap();
        handle.lock().await.move_count = 4;
        assert_eq!(repo.get("g1").await.unwrap().lock().await.move_count, 4);

        let mut other = session("g1");
        other.owner = "mallory".to_string();
        assert!(repo.insert(other).await.is_none());

        let kept = repo.get("g1").await.unwrap();
        assert_eq!(kept.lock().await.move_count, 4);
        assert_eq!(kept.lock().await.owner, "alice");
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_evicted_id_is_free_again() {
        let repo = GameRepository::new();
        let mut old = session("g1");
        old.last_activity = Utc::now() - chrono::Duration::days(2);
        repo.insert(old).await.unwrap();

        let removed = repo
            .remove_stale(Utc::now(), Duration::from_secs(3600), Duration::from_secs(60))
            .await;
        assert_eq!(removed, vec!["g1".to_string()]);
        assert_eq!(repo.len().await, 0);
        assert!(repo.get("g1").await.is_none());

        assert!(repo.insert(session("g1")).await.is_some());
    }

    #[tokio::test]
    async fn test_remove_stale_sessions() {
        let repo = GameRepository::new();
        let now = Utc::now();

        let fresh = session("fresh");
        let mut idle = session("idle");
        idle.last_activity = now - chrono::Duration::hours(2);
        let mut finished = session("finished");
        finished.status = GameStatus::Checkmate;
        finished.last_activity = now - chrono::Duration::minutes(20);

        for s in [fresh, idle, finished] {
            repo.insert(s).await.unwrap();
        }

        let mut removed = repo
            .remove_stale(now, Duration::from_secs(3600), Duration::from_secs(600))
            .await;
        removed.sort();
        assert_eq!(removed, vec!["finished".to_string(), "idle".to_string()]);
        assert!(repo.get("fresh").await.is_some());
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_stale_skips_locked_session() {
        let repo = GameRepository::new();
        let mut busy = session("busy");
        busy.last_activity = Utc::now() - chrono::Duration::days(3);
        let handle = repo.insert(busy).await.unwrap();

        let guard = handle.lock().await;
        let removed = repo
            .remove_stale(Utc::now(), Duration::from_secs(60), Duration::from_secs(60))
            .await;
        assert!(removed.is_empty());
        drop(guard);

        let removed = repo
            .remove_stale(Utc::now(), Duration::from_secs(60), Duration::from_secs(60))
            .await;
        assert_eq!(removed, vec!["busy".to_string()]);
    }
}
