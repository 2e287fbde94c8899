//! HTTP surface: `POST /process` and `GET /health`

mod errors;
mod handlers;

pub use errors::ApiError;
pub use handlers::{health_handler, process_handler};

use crate::config::Config;
use crate::service::QueryService;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QueryService>,
}

/// Build the router around a query service
pub fn create_router(service: Arc<QueryService>) -> Router {
    let cors = service.config().server.cors;
    let router = Router::new()
        .route("/process", post(process_handler))
        .route("/health", get(health_handler))
        .with_state(AppState { service })
        .layer(TraceLayer::new_for_http());

    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Bind the configured address and serve until Ctrl-C
pub async fn serve(config: Arc<Config>) -> anyhow::Result<()> {
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    let service = Arc::new(QueryService::with_default_components(config));
    let app = create_router(service);

    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
