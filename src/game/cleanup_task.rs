use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, instrument};

use super::service::GameService;

/// Configuration for the cleanup task
#[derive(Debug, Clone, PartialEq)]
pub struct CleanupConfig {
    /// How often to run the cleanup task
    pub cleanup_interval: Duration,
    /// How long an unfinished game may sit without a move
    pub idle_threshold: Duration,
    /// How long a finished game stays readable
    pub finished_threshold: Duration,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: Duration::from_secs(5 * 60), // 5 minutes
            idle_threshold: Duration::from_secs(24 * 60 * 60), // 24 hours
            finished_threshold: Duration::from_secs(30 * 60), // 30 minutes
        }
    }
}

/// Periodically drops stale sessions from memory. Their logs stay on disk,
/// so an evicted game can still be resumed.
#[instrument(skip(game_service))]
pub async fn start_cleanup_task(game_service: Arc<GameService>, config: CleanupConfig) {
    info!(
        cleanup_interval_secs = config.cleanup_interval.as_secs(),
        idle_threshold_secs = config.idle_threshold.as_secs(),
        finished_threshold_secs = config.finished_threshold.as_secs(),
        "Starting game cleanup background task"
    );

    let mut cleanup_interval = interval(config.cleanup_interval);

    loop {
        cleanup_interval.tick().await;
        let removed = cleanup_stale_games(&game_service, &config).await;
        if removed > 0 {
            info!(removed, "Game cleanup completed");
        }
    }
}

/// One cleanup pass; returns how many sessions were dropped
async fn cleanup_stale_games(game_service: &Arc<GameService>, config: &CleanupConfig) -> usize {
    game_service
        .remove_stale_games(Utc::now(), config.idle_threshold, config.finished_threshold)
        .await
}
