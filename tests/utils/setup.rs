#![allow(dead_code)] // Test utilities may not all be used in every test

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;

use chess_ai::{
    server, stats::InMemoryStatsRepository, AppConfig, AppState, FileStatsRepository,
    InMemoryModelRegistry, InMemoryUserRepository, ModelRegistry, ServiceKind,
    SqliteModelRegistry, SqliteUserRepository, StatsRepository, UserRepository, STATS_FILE,
};

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub data_dir: PathBuf,
    _dir: Option<TempDir>,
}

impl TestApp {
    pub fn log_path(&self, game_id: &str) -> PathBuf {
        self.state.game_service.move_log().path_for(game_id)
    }

    pub fn read_log(&self, game_id: &str) -> String {
        std::fs::read_to_string(self.log_path(game_id)).unwrap_or_default()
    }
}

type ConfigOverride = Box<dyn FnOnce(&mut AppConfig)>;

pub struct TestAppBuilder {
    kind: ServiceKind,
    sqlite: bool,
    shared_dir: Option<PathBuf>,
    overrides: Vec<ConfigOverride>,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            kind: ServiceKind::All,
            sqlite: false,
            shared_dir: None,
            overrides: vec![],
        }
    }

    pub fn with_service(mut self, kind: ServiceKind) -> Self {
        self.kind = kind;
        self
    }

    /// Back the app with a SQLite file and a stats file instead of the
    /// in-memory stores
    pub fn with_sqlite(mut self) -> Self {
        self.sqlite = true;
        self
    }

    /// Reuse another app's data directory (database file and move logs),
    /// as a restarted process would
    pub fn sharing_data_with(mut self, other: &Path) -> Self {
        self.shared_dir = Some(other.to_path_buf());
        self
    }

    pub fn with_config(mut self, f: impl FnOnce(&mut AppConfig) + 'static) -> Self {
        self.overrides.push(Box::new(f));
        self
    }

    pub async fn build(self) -> TestApp {
        let (dir, data_dir) = match self.shared_dir {
            Some(path) => (None, path),
            None => {
                let dir = tempfile::tempdir().unwrap();
                let path = dir.path().to_path_buf();
                (Some(dir), path)
            }
        };

        let mut config = AppConfig::for_tests(data_dir.join("logs"));
        config.service.kind = self.kind;
        for apply in self.overrides {
            apply(&mut config);
        }

        let (user_repository, stats_repository, model_registry): (
            Arc<dyn UserRepository + Send + Sync>,
            Arc<dyn StatsRepository>,
            Arc<dyn ModelRegistry>,
        ) = if self.sqlite {
            let url = format!("sqlite://{}", data_dir.join("users.db").display());
            config.storage.database_url = url.clone();
            let users = SqliteUserRepository::connect(&url).await.unwrap();
            let models = SqliteModelRegistry::new(users.pool().clone()).await.unwrap();
            let stats = FileStatsRepository::open(config.storage.game_log_dir.join(STATS_FILE))
                .await
                .unwrap();
            (Arc::new(users), Arc::new(stats), Arc::new(models))
        } else {
            (
                Arc::new(InMemoryUserRepository::new()),
                Arc::new(InMemoryStatsRepository::new()),
                Arc::new(InMemoryModelRegistry::new()),
            )
        };

        let default_model = config.agents.default_model.clone();
        let state = AppState::with_stores(config, user_repository, stats_repository, model_registry);
        state.auth_service.seed_default_admin().await.unwrap();
        state
            .admin_service
            .seed_default_model(&default_model)
            .await
            .unwrap();
        let app = server::router(state.clone(), self.kind);

        TestApp {
            app,
            state,
            data_dir,
            _dir: dir,
        }
    }
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}
