//! Router and listener setup

use super::handlers::{health, predict, root, AppState};
use crate::risk::RiskModel;
use crate::utils::{Config, CorsConfig};
use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tracing::{info, warn};

/// CORS policy allowing only the configured frontend origin, with credentials
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    match config.frontend_url.as_deref() {
        Some(url) => match HeaderValue::from_str(url.trim().trim_end_matches('/')) {
            Ok(origin) => {
                info!("Allowing cross-origin requests from {}", url);
                layer.allow_origin(AllowOrigin::exact(origin))
            }
            Err(_) => {
                warn!("Ignoring invalid frontend origin {:?}", url);
                layer
            }
        },
        None => {
            warn!("No frontend origin configured, cross-origin requests will be refused");
            layer
        }
    }
}

/// Build the application router
pub fn router(model: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .layer(cors)
        .with_state(model)
}

/// Bind to the configured address and serve until Ctrl-C
pub async fn serve(config: &Config, model: RiskModel) -> Result<()> {
    if !model.is_loaded() {
        warn!("Starting without a model, /predict will answer 503");
    }

    let app = router(Arc::new(model), cors_layer(&config.cors));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Accident risk API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
