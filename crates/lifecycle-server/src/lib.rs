pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use lifecycle_core::LifecycleEngine;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(engine: Arc<LifecycleEngine>) -> Router {
    let app_state = state::AppState::new(engine);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/events", post(routes::events::post_event))
        .route("/api/health", get(routes::health::health))
        .route("/api/config", get(routes::config::get_config))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the intake server.
pub async fn serve(engine: Arc<LifecycleEngine>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(engine, listener).await
}

/// Start the intake server on a pre-bound listener.
///
/// Lets the caller read the actual port first when binding port 0.
pub async fn serve_on(engine: Arc<LifecycleEngine>, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(engine);

    tracing::info!("lifecycle intake listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
