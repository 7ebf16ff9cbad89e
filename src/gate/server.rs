use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::api::{self, AppState};
use super::db::{DbHandle, GateDb};
use super::identity::{HeaderIdentity, SelfOnly};
use super::service::Services;
use crate::config::GateConfig;

/// Build the full application router.
pub fn build_router(state: Arc<AppState>, dev_mode: bool) -> Router {
    let app = api::api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if dev_mode {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Open the store, load the catalog and wire the HTTP state.
pub fn build_state(config: &GateConfig) -> Result<Arc<AppState>> {
    if let Some(parent) = config.database.path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let db = GateDb::new(&config.database.path).context("Failed to initialize progress store")?;
    let services = Services::from_store(
        DbHandle::new(db),
        Arc::new(SelfOnly),
        config.progress.clear_completed_on_regress,
    )
    .context("Failed to load catalog")?;

    Ok(Arc::new(AppState {
        services,
        identity: Arc::new(HeaderIdentity::new(&config.identity.learner_header)?),
        routing: config.routing.clone(),
    }))
}

/// Start the gate server.
pub async fn start_server(config: &GateConfig) -> Result<()> {
    let state = build_state(config)?;
    if config.progress.clear_completed_on_regress {
        warn!("progress.clear_completed_on_regress is on: completed_at is cleared when a record regresses");
    }

    let app = build_router(state, config.server.dev_mode);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(
        %local_addr,
        db = %config.database.path.display(),
        dev_mode = config.server.dev_mode,
        "lessongate listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_config(dir: &std::path::Path) -> GateConfig {
        let mut config = GateConfig::default();
        config.database.path = dir.join("nested").join("progress.db");
        config
    }

    #[tokio::test]
    async fn test_health_via_full_router() {
        let dir = tempfile::tempdir().unwrap();
        let state = build_state(&test_config(dir.path())).unwrap();
        let app = build_router(state, false);
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_build_state_creates_database_directory() {
        let dir = tempfile::tempdir().unwrap();
        build_state(&test_config(dir.path())).unwrap();
        assert!(dir.path().join("nested").join("progress.db").exists());
    }

    #[tokio::test]
    async fn test_empty_store_degrades_check_to_landing() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(build_state(&test_config(dir.path())).unwrap(), true);
        let req = Request::builder()
            .method("POST")
            .uri("/api/access/check")
            .header("content-type", "application/json")
            .header("x-learner-id", "ada")
            .body(Body::from(r#"{"moduleSlug":"a"}"#))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["canAccess"], false);
        assert_eq!(body["redirectTo"], "/home");
    }
}
