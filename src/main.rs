use std::sync::Arc;

use chess_ai::{
    server, start_cleanup_task, AppConfig, AppState, FileStatsRepository, ServiceKind,
    SqliteModelRegistry, SqliteUserRepository, STATS_FILE,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chess_ai=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "Server stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let kind = config.service.kind;
    let bind_addr = config.service.bind_addr.clone();
    info!(service = %kind, "Starting chess AI service");

    let user_repository = SqliteUserRepository::connect(&config.storage.database_url).await?;
    let model_registry = Arc::new(SqliteModelRegistry::new(user_repository.pool().clone()).await?);
    let stats_path = config.storage.game_log_dir.join(STATS_FILE);
    let stats_repository = Arc::new(FileStatsRepository::open(stats_path).await?);
    let default_model = config.agents.default_model.clone();
    let cleanup = config.cleanup.clone();

    let app_state = AppState::with_stores(
        config,
        Arc::new(user_repository),
        stats_repository,
        model_registry,
    );

    if app_state.auth_service.seed_default_admin().await? {
        info!("Seeded default admin account; change its password");
    }
    app_state.admin_service.seed_default_model(&default_model).await?;

    if matches!(kind, ServiceKind::All | ServiceKind::Engine) {
        tokio::spawn(start_cleanup_task(app_state.game_service.clone(), cleanup));
    }

    let app = server::router(app_state, kind);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Server running on http://{}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
