use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::config::ServiceKind;
use crate::shared::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub version: &'static str,
    pub storage: &'static str,
}

/// GET /health
///
/// Reports `degraded` rather than failing when the credential store cannot
/// answer, so probes can tell a live process from a broken store.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let storage = match state.user_repository.counts().await {
        Ok(_) => "ok",
        Err(e) => {
            warn!(error = %e, "Health check could not reach the credential store");
            "unavailable"
        }
    };

    Json(HealthResponse {
        status: if storage == "ok" { "healthy" } else { "degraded" },
        service: format!("chess-ai-{}-service", state.config.service.kind),
        version: env!("CARGO_PKG_VERSION"),
        storage,
    })
}

/// Mounts the routers for one service kind. `All` serves every surface
/// from a single process.
pub fn router(state: AppState, kind: ServiceKind) -> Router {
    let mut app = Router::new().route("/health", get(health));

    if matches!(kind, ServiceKind::All | ServiceKind::Auth) {
        app = app.merge(crate::auth::router());
    }
    if matches!(kind, ServiceKind::All | ServiceKind::Admin) {
        app = app.merge(crate::admin::router(state.clone()));
    }
    if matches!(kind, ServiceKind::All | ServiceKind::Engine) {
        app = app
            .merge(crate::game::router(state.clone()))
            .merge(crate::expert::router());
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
