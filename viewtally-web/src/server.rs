//! HTTP server for the view-count endpoint.

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use tower_http::trace::TraceLayer;
use viewtally_core::config::CorsConfig;
use viewtally_core::{ViewCountAggregator, ViewTallyConfig};

use crate::cors::apply_cors;
use crate::handlers::{healthz, viewcount, viewcount_head, viewcount_preflight};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<ViewCountAggregator>,
    /// Rendered `Cache-Control` value for successful responses
    pub cache_control: String,
    pub cors: Arc<CorsConfig>,
}

impl AppState {
    pub fn new(aggregator: ViewCountAggregator, config: &ViewTallyConfig) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            cache_control: config.cache.header_value(),
            cors: Arc::new(config.cors.clone()),
        }
    }
}

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/viewcount",
            get(viewcount)
                .head(viewcount_head)
                .options(viewcount_preflight),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), apply_cors))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs the server until Ctrl-C.
///
/// # Errors
///
/// - `ViewTallyError::Configuration` - If the HTTP client cannot be built
/// - `std::io::Error` - If the listener cannot bind or the server fails
pub async fn run_server(config: ViewTallyConfig) -> Result<(), Box<dyn std::error::Error>> {
    let aggregator = ViewCountAggregator::from_config(&config)?;

    let providers = aggregator.configured_providers();
    if providers.is_empty() {
        tracing::warn!(
            "No provider credentials configured; /api/viewcount will report a configuration error"
        );
    } else {
        tracing::info!("Configured providers: {providers:?}");
    }

    let state = AppState::new(aggregator, &config);
    let app = build_router(state);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Viewtally listening on http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Viewtally stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
