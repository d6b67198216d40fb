//! HTTP relay server.
//!
//! [`router`] wires the edge-info, story and places routes behind a CORS
//! layer; [`serve`] binds it and runs until ctrl-c.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::TimewarpConfig;
use crate::routes;
use crate::settings::SettingsStore;
use crate::story::relay::StoryRelay;

/// State shared by every handler.
pub struct AppState {
    pub relay: StoryRelay,
    pub settings: Arc<SettingsStore>,
}

pub type SharedState = Arc<AppState>;

/// Build the application router.
pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let edge_info = || get(routes::edge::edge_info).fallback(routes::method_not_allowed);
    let story = || post(routes::story::story).fallback(routes::method_not_allowed);
    let ask = || post(routes::story::ask).fallback(routes::method_not_allowed);

    Router::new()
        .route("/api/edge/info", edge_info())
        .route("/api/edge/info/", edge_info())
        .route("/api/history/story", story())
        .route("/api/history/story/", story())
        .route("/api/history/ask", ask())
        .route("/api/history/ask/", ask())
        .route(
            "/api/places",
            get(routes::edge::places).fallback(routes::method_not_allowed),
        )
        .fallback(routes::not_found)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Start the relay server and block until ctrl-c.
pub async fn serve(config: TimewarpConfig) -> Result<()> {
    let settings = Arc::new(SettingsStore::load(config.resolved_settings_path())?);
    let relay = StoryRelay::new(config.providers.clone())?;

    let snapshot = settings.snapshot();
    if snapshot.api_keys.get(snapshot.provider).is_none() {
        tracing::warn!(
            provider = %snapshot.provider,
            "no credential configured; story requests will fail until one is set"
        );
    }

    let state = Arc::new(AppState { relay, settings });
    let app = router(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "timewarp relay listening at http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down relay server");
        })
        .await?;

    Ok(())
}
